//! Example: draw a scripted stroke on a model and print one frame
//!
//! Usage: cargo run --example headless_sketch -- [path/to/model.glb] [--tube]

use std::env;
use std::io;

use meshmark_core::projection::screen_to_ndc;
use meshmark_core::{AnnotationEngine, Camera, Layer, Mesh, ModelLoader, OrbitControls, PointerEvent, Scene, SceneNode};
use meshmark_terminal::AsciiRenderer;
use nalgebra::Point2;

const WIDTH: usize = 80;
const HEIGHT: usize = 36;

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let tube = args.iter().any(|a| a == "--tube");

    let mesh = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .and_then(ModelLoader::accept)
        .map(|handle| handle.load())
        .transpose()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?
        .unwrap_or_else(|| Mesh::cube(2.0));

    let mut scene = Scene::new();
    scene.add(Layer::Model, SceneNode::Mesh(mesh));

    let mut controls = OrbitControls::default();
    if let Some(bounds) = scene.model_bounds() {
        controls.frame(&bounds);
    }
    let mut camera = Camera {
        aspect: WIDTH as f32 / (2.0 * HEIGHT as f32),
        ..Camera::default()
    };
    controls.sync(&mut camera);

    let mut engine = AnnotationEngine::default();
    if tube {
        engine.handle_key('t', &mut controls);
    }
    engine.handle_key('d', &mut controls);

    // A wavy stroke across the middle of the view, one cell per frame
    engine.pointer(PointerEvent::Press);
    for i in 0..30 {
        let x = 25.0 + i as f32;
        let y = HEIGHT as f32 / 2.0 + (i as f32 * 0.4).sin() * 3.0;
        let pointer: Point2<f32> = screen_to_ndc(x, y, WIDTH as u32, HEIGHT as u32);
        engine.on_frame(&mut scene, &camera, &pointer);
    }
    engine.pointer(PointerEvent::Release);
    engine.on_frame(&mut scene, &camera, &Point2::origin());

    let mut renderer = AsciiRenderer::new(WIDTH, HEIGHT);
    renderer.render_scene(&scene, &camera);
    for y in 0..HEIGHT {
        let row: String = (0..WIDTH).map(|x| renderer.char_at(x, y).unwrap_or(' ')).collect();
        println!("{}", row);
    }
    println!("captured {} points", engine.path().len());

    Ok(())
}
