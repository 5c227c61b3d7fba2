#![allow(clippy::too_many_arguments)]

use std::time::Instant;

use anyhow::Result;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::WindowBuilder;

use evk_sprite::config::{EngineConfig, Msaa, WindowHandle};
use evk_sprite::facade;

fn main() -> Result<()> {
    evk_sprite::logging::init();

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title("evk-sprite demo")
        .with_inner_size(LogicalSize::new(1280, 720))
        .build(&event_loop)?;

    let window_handle = WindowHandle::new(&window);
    let config = EngineConfig {
        app_name: "evk-sprite demo",
        engine_name: "evk-sprite",
        app_version: vulkanalia::vk::make_version(1, 0, 0),
        engine_version: vulkanalia::vk::make_version(1, 0, 0),
        width: 1280,
        height: 720,
        msaa: Msaa::X4,
        vsync: false,
        viewport: false,
        window: &window_handle,
    };

    unsafe { facade::init(&config)? };

    let mut last_tick = Instant::now();

    event_loop.run(move |event, elwt| match event {
        Event::AboutToWait => window.request_redraw(),
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::RedrawRequested if !elwt.exiting() => {
                let now = Instant::now();
                let timestep = (now - last_tick).as_secs_f32();
                last_tick = now;
                unsafe { facade::update(timestep).unwrap() };
            }
            WindowEvent::Resized(size) => {
                facade::set_framebuffer_size(size.width, size.height);
            }
            WindowEvent::CloseRequested => {
                elwt.exit();
                unsafe { facade::shutdown() };
            }
            _ => (),
        },
        _ => (),
    })?;

    Ok(())
}
