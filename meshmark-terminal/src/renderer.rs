//! ASCII rasterizer for terminal rendering

use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use meshmark_core::{Camera, DisplayGeometry, Layer, Mesh, Scene, SceneNode, Triangle};
use nalgebra::Point3;
use std::io::Write;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Pulls overlay strokes slightly towards the viewer so they win over the
/// surface they were drawn on
const OVERLAY_DEPTH_BIAS: f32 = 1e-3;

const LINE_CHAR: char = '*';
const MARKER_CHAR: char = 'o';

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shading {
    /// Luminosity ramp coloured by brightness
    Model,
    /// Luminosity ramp in one colour
    Tinted(Color),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    character: char,
    color: Color,
}

const EMPTY: Cell = Cell {
    character: ' ',
    color: Color::DarkGrey,
};

/// ASCII renderer that converts the scene to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    cells: Vec<Cell>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            cells: vec![EMPTY; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.cells.fill(EMPTY);
    }

    /// Character at a cell, for inspection
    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.cells[y * self.width + x].character)
    }

    /// Rasterise every object of the scene: meshes shaded, the annotation
    /// path as a line or tinted tube, the marker as a single glyph
    pub fn render_scene(&mut self, scene: &Scene, camera: &Camera) {
        for (_, layer, node) in scene.iter() {
            match (layer, node) {
                (Layer::Model, SceneNode::Mesh(mesh)) => self.render_mesh(mesh, camera, Shading::Model),
                (Layer::Overlay, SceneNode::Mesh(mesh)) => {
                    self.render_mesh(mesh, camera, Shading::Tinted(Color::Magenta))
                }
                (_, SceneNode::Path(DisplayGeometry::Polyline(line))) => {
                    for (a, b) in line.segments() {
                        self.render_segment(a, b, camera, LINE_CHAR, Color::Red);
                    }
                }
                (_, SceneNode::Path(DisplayGeometry::Tube(tube))) => {
                    self.render_mesh(&tube.to_mesh(), camera, Shading::Tinted(Color::Red))
                }
                (_, SceneNode::Points(points)) => {
                    for point in points {
                        self.render_point(point, camera, MARKER_CHAR, Color::Green);
                    }
                }
            }
        }
    }

    fn render_mesh(&mut self, mesh: &Mesh, camera: &Camera, shading: Shading) {
        for triangle in &mesh.triangles {
            self.render_triangle(triangle, camera, shading);
        }
    }

    fn render_triangle(&mut self, triangle: &Triangle, camera: &Camera, shading: Shading) {
        // Project vertices to screen space
        let mut screen_coords = [(0.0, 0.0, 0.0); 3];
        for (slot, vertex) in screen_coords.iter_mut().zip(&triangle.vertices) {
            match camera.project_to_screen(&vertex.position, self.width as u32, self.height as u32) {
                Some(coords) => *slot = coords,
                None => return, // Triangle is clipped
            }
        }

        // Light from the viewer, both faces lit
        let normal = triangle.calculate_normal();
        let brightness = normal.dot(&-camera.forward()).abs();

        // Map brightness to character
        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
        let char_index = char_index.clamp(1, LUMINOSITY_RAMP.len() - 1);
        let character = LUMINOSITY_RAMP[char_index];
        let color = match shading {
            Shading::Model => ramp_color(character),
            Shading::Tinted(color) => color,
        };
        let bias = match shading {
            Shading::Model => 0.0,
            Shading::Tinted(_) => OVERLAY_DEPTH_BIAS,
        };

        self.rasterize_triangle(&screen_coords, Cell { character, color }, bias);
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], cell: Cell, bias: f32) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                // Barycentric coordinates
                if let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        // Interpolate depth
                        let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2 - bias;
                        self.plot(x, y, depth, cell);
                    }
                }
            }
        }
    }

    /// Bresenham between the projected end points, depth interpolated
    fn render_segment(&mut self, a: &Point3<f32>, b: &Point3<f32>, camera: &Camera, character: char, color: Color) {
        let (w, h) = (self.width as u32, self.height as u32);
        let (Some(start), Some(end)) = (camera.project_to_screen(a, w, h), camera.project_to_screen(b, w, h)) else {
            return;
        };

        let (x0, y0) = (start.0.floor() as i32, start.1.floor() as i32);
        let (x1, y1) = (end.0.floor() as i32, end.1.floor() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        // Segments reaching far off screen are skipped rather than walked
        if dx.max(-dy) > 4 * (self.width + self.height) as i32 {
            return;
        }
        let steps = dx.max(-dy).max(1) as f32;

        let (mut x, mut y) = (x0, y0);
        let mut err = dx + dy;
        let mut step = 0.0;
        loop {
            let depth = start.2 + (end.2 - start.2) * (step / steps) - OVERLAY_DEPTH_BIAS;
            self.plot(x, y, depth, Cell { character, color });
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
            step += 1.0;
        }
    }

    fn render_point(&mut self, point: &Point3<f32>, camera: &Camera, character: char, color: Color) {
        if let Some((x, y, depth)) = camera.project_to_screen(point, self.width as u32, self.height as u32) {
            self.plot(x.floor() as i32, y.floor() as i32, depth - OVERLAY_DEPTH_BIAS, Cell { character, color });
        }
    }

    fn plot(&mut self, x: i32, y: i32, depth: f32, cell: Cell) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if depth < self.depth_buffer[idx] {
            self.depth_buffer[idx] = depth;
            self.cells[idx] = cell;
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (y, row) in self.cells.chunks(self.width.max(1)).enumerate() {
            writer.queue(cursor::MoveTo(0, y as u16))?;
            for cell in row {
                writer.queue(SetForegroundColor(cell.color))?;
                writer.queue(Print(cell.character))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Color based on character intensity
fn ramp_color(c: char) -> Color {
    match c {
        ' ' | '.' | ':' => Color::DarkGrey,
        '-' | '=' => Color::Grey,
        '+' | '*' => Color::White,
        '#' | '%' | '@' => Color::Cyan,
        _ => Color::White,
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
