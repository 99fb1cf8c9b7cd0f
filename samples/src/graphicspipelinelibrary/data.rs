
use ash::vk;
use parking_lot::Mutex;

use vkbase::{Mat4F, Vec4F};

use std::collections::VecDeque;
use std::sync::Arc;

pub const GRID_COLUMNS: u32 = 3;
pub const GRID_ROWS   : u32 = 3;
/// cells of the grid, one pipeline variant is shown in each of them.
pub const MAX_VARIANTS: usize = (GRID_COLUMNS * GRID_ROWS) as usize;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UboScene {
    pub projection: Mat4F,
    pub model_view: Mat4F,
    pub light_pos : Vec4F,
}

/// Per cell values pushed before each draw.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CellPushConstants {
    pub color: [f32; 4],
}

/// The shading model selected by the specialization constant of the fragment shader.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ShadingModel {
    Phong,
    Toon,
    Normals,
    Rim,
}

impl ShadingModel {

    pub const ALL: [ShadingModel; 4] = [ShadingModel::Phong, ShadingModel::Toon, ShadingModel::Normals, ShadingModel::Rim];

    /// The value of specialization constant 0.
    pub fn constant(&self) -> u32 {
        match self {
            | ShadingModel::Phong   => 0,
            | ShadingModel::Toon    => 1,
            | ShadingModel::Normals => 2,
            | ShadingModel::Rim     => 3,
        }
    }

    /// Shading models cycle when there are more variants than models.
    pub fn for_variant(index: usize) -> ShadingModel {
        ShadingModel::ALL[index % ShadingModel::ALL.len()]
    }
}

/// A pipeline variant, linked from the shared libraries and its own fragment shader library.
#[derive(Debug, Clone, Copy)]
pub struct LinkedVariant {
    pub model: ShadingModel,
    pub color: [f32; 4],
    pub fragment_library: vk::Pipeline,
    pub pipeline: vk::Pipeline,
    /// time spent on compiling and linking, in milliseconds.
    pub build_millis: f32,
}

/// Hands results from a background thread to the render thread.
///
/// Every pushed item is returned by exactly one `poll`.
pub struct PipelineQueue<T> {
    inner: Arc<Mutex<VecDeque<T>>>,
}

impl<T> Clone for PipelineQueue<T> {

    fn clone(&self) -> PipelineQueue<T> {
        PipelineQueue { inner: self.inner.clone() }
    }
}

impl<T> Default for PipelineQueue<T> {

    fn default() -> PipelineQueue<T> {
        PipelineQueue { inner: Arc::new(Mutex::new(VecDeque::new())) }
    }
}

impl<T> PipelineQueue<T> {

    pub fn push(&self, item: T) {
        self.inner.lock().push_back(item);
    }

    /// Take all items available now, in push order.
    pub fn poll(&self) -> Vec<T> {
        self.inner.lock().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// Split `extent` into `columns` x `rows` viewports, row by row from top left.
pub fn viewport_cells(extent: vk::Extent2D, columns: u32, rows: u32) -> Vec<vk::Viewport> {

    let cell_width  = extent.width  as f32 / columns as f32;
    let cell_height = extent.height as f32 / rows as f32;

    (0..rows).flat_map(|row| {
        (0..columns).map(move |column| {
            vk::Viewport {
                x: column as f32 * cell_width,
                y: row as f32 * cell_height,
                width : cell_width,
                height: cell_height,
                min_depth: 0.0,
                max_depth: 1.0,
            }
        })
    }).collect()
}

pub fn scissor_of_cell(cell: &vk::Viewport) -> vk::Rect2D {

    vk::Rect2D {
        offset: vk::Offset2D { x: cell.x as i32, y: cell.y as i32 },
        extent: vk::Extent2D { width: cell.width.ceil() as u32, height: cell.height.ceil() as u32 },
    }
}

/// A distinct color for each variant, spread around the hue circle.
pub fn variant_color(index: usize) -> [f32; 4] {

    let hue = (index as f32 * 0.618_034).fract() * 6.0;
    let x = 1.0 - (hue % 2.0 - 1.0).abs();
    let (r, g, b) = match hue as u32 {
        | 0 => (1.0, x, 0.0),
        | 1 => (x, 1.0, 0.0),
        | 2 => (0.0, 1.0, x),
        | 3 => (0.0, x, 1.0),
        | 4 => (x, 0.0, 1.0),
        | _ => (1.0, 0.0, x),
    };
    [0.25 + r * 0.75, 0.25 + g * 0.75, 0.25 + b * 0.75, 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn queue_hands_each_result_once() {

        let queue: PipelineQueue<u32> = PipelineQueue::default();
        let producer = queue.clone();

        let worker = std::thread::spawn(move || {
            for i in 0..16 {
                producer.push(i);
            }
        });

        let mut received = Vec::new();
        while received.len() < 16 {
            received.extend(queue.poll());
            std::thread::yield_now();
        }
        worker.join().unwrap();

        assert_eq!(received, (0..16).collect::<Vec<_>>());
        assert!(queue.poll().is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn cells_tile_the_extent() {

        let extent = vk::Extent2D { width: 1280, height: 720 };
        let cells = viewport_cells(extent, GRID_COLUMNS, GRID_ROWS);
        assert_eq!(cells.len(), MAX_VARIANTS);

        let area: f32 = cells.iter().map(|c| c.width * c.height).sum();
        assert_relative_eq!(area, 1280.0 * 720.0, epsilon = 1.0);

        let last = cells.last().unwrap();
        assert_relative_eq!(last.x + last.width, 1280.0, epsilon = 1e-3);
        assert_relative_eq!(last.y + last.height, 720.0, epsilon = 1e-3);
        // row major order.
        assert!(cells[1].x > cells[0].x && cells[1].y == cells[0].y);
    }

    #[test]
    fn shading_models_cycle_through_variants() {

        assert_eq!(ShadingModel::for_variant(0), ShadingModel::Phong);
        assert_eq!(ShadingModel::for_variant(5), ShadingModel::Toon);
        let constants: Vec<u32> = ShadingModel::ALL.iter().map(ShadingModel::constant).collect();
        assert_eq!(constants, vec![0, 1, 2, 3]);
    }

    #[test]
    fn variant_colors_are_bright_and_distinct() {

        let colors: Vec<[f32; 4]> = (0..MAX_VARIANTS).map(variant_color).collect();
        for (i, a) in colors.iter().enumerate() {
            assert!(a[..3].iter().all(|&c| c >= 0.25 && c <= 1.0));
            for b in colors.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
