use gt_stats::error::StatsError;
use gt_stats::image::ImageF32;
use gt_stats::render::{DepthRenderer, RenderRequest};
use image::{ImageBuffer, Luma};
use nalgebra::Vector3;
use std::fs;
use std::path::{Path, PathBuf};

/// Range image of size `w × h` holding `value` over a `size × size` block at
/// `(x0, y0)` and zero elsewhere.
pub fn block_image(w: usize, h: usize, x0: usize, y0: usize, size: usize, value: f32) -> ImageF32 {
    assert!(x0 + size <= w && y0 + size <= h, "block must fit the image");
    let mut img = ImageF32::new(w, h);
    img.fill_rect(x0, y0, x0 + size, y0 + size, value);
    img
}

/// Fresh, empty scratch directory unique to this test process.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gt_stats_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// Store a depth buffer (millimetres, scale 1) as a 16-bit PNG.
pub fn write_depth_png(path: &Path, depth: &ImageF32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create depth dir");
    }
    let raw: Vec<u16> = depth.data.iter().map(|&d| d.round() as u16).collect();
    let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(depth.w as u32, depth.h as u32, raw).expect("depth buffer size");
    buf.save(path).expect("write depth png");
}

pub fn write_json(path: &Path, value: &serde_json::Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create json dir");
    }
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).expect("write json");
}

/// Test renderer drawing every object as a square of side `2 * half` pixels
/// centred on the projection of the pose translation, at depth `t.z`.
/// Objects behind the camera produce an empty buffer.
pub struct BlockRenderer {
    pub half: usize,
}

impl DepthRenderer for BlockRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<ImageF32, StatsError> {
        let (w, h) = request.image_size;
        let mut depth = ImageF32::new(w, h);
        // model origin in the camera frame
        let t = request.pose.transform(&Vector3::zeros());
        if t.z <= 0.0 {
            return Ok(depth);
        }
        let k = &request.intrinsics;
        let u = (k.fx * t.x / t.z + k.cx).round() as i64;
        let v = (k.fy * t.y / t.z + k.cy).round() as i64;
        let half = self.half as i64;
        let clamp = |value: i64, max: usize| value.clamp(0, max as i64) as usize;
        let (x0, x1) = (clamp(u - half, w), clamp(u + half, w));
        let (y0, y1) = (clamp(v - half, h), clamp(v + half, h));
        depth.fill_rect(x0, y0, x1, y1, t.z as f32);
        Ok(depth)
    }
}

/// Renderer that ignores the request size; used to provoke shape errors.
pub struct FixedSizeRenderer {
    pub w: usize,
    pub h: usize,
}

impl DepthRenderer for FixedSizeRenderer {
    fn render(&self, _request: &RenderRequest<'_>) -> Result<ImageF32, StatsError> {
        Ok(ImageF32::new(self.w, self.h))
    }
}

pub const WIDTH: usize = 32;
pub const HEIGHT: usize = 24;
pub const CAM_K: [f64; 9] = [100.0, 0.0, 16.0, 0.0, 100.0, 12.0, 0.0, 0.0, 1.0];

fn gt_entry(obj_id: u32, t: [f64; 3]) -> serde_json::Value {
    serde_json::json!({
        "obj_id": obj_id,
        "cam_R_m2c": [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        "cam_t_m2c": t,
    })
}

/// Writes a one-scene dataset with two images under `root`.
///
/// Image 0:
/// - gt 0 (obj 1) at the image centre, 500 mm, fully visible;
/// - gt 1 (obj 2) left of centre at 800 mm, its left half hidden behind a
///   400 mm occluder;
/// - gt 2 (obj 1) behind the camera.
///
/// Image 1: gt 0 (obj 2) at the centre with no depth measured at all.
pub fn write_dataset(root: &Path, scene_id: u32) {
    let scene_dir = root.join(format!("{scene_id:02}"));
    let info = serde_json::json!({
        "0": { "cam_K": CAM_K },
        "1": { "cam_K": CAM_K },
    });
    write_json(&scene_dir.join("info.json"), &info);

    let gt = serde_json::json!({
        "0": [
            gt_entry(1, [0.0, 0.0, 500.0]),
            gt_entry(2, [-80.0, 0.0, 800.0]),
            gt_entry(1, [0.0, 0.0, -500.0]),
        ],
        "1": [gt_entry(2, [0.0, 0.0, 500.0])],
    });
    write_json(&scene_dir.join("gt.json"), &gt);

    // Image 0: background at 1000 mm, gt 0 block measured at 500 mm,
    // occluder at 400 mm over the left half of gt 1 (x in [3, 6)).
    let mut depth0 = ImageF32::new(WIDTH, HEIGHT);
    depth0.fill_rect(0, 0, WIDTH, HEIGHT, 1000.0);
    depth0.fill_rect(13, 9, 19, 15, 500.0);
    depth0.fill_rect(3, 9, 6, 15, 400.0);
    write_depth_png(&scene_dir.join("depth").join("0000.png"), &depth0);

    let depth1 = ImageF32::new(WIDTH, HEIGHT);
    write_depth_png(&scene_dir.join("depth").join("0001.png"), &depth1);
}

/// Run configuration for the dataset written by [`write_dataset`].
pub fn config_json(root: &Path, overlays: bool) -> serde_json::Value {
    let out = root.join("out");
    serde_json::json!({
        "dataset": {
            "name": "synthetic",
            "root": root,
            "obj_count": 2,
            "scene_count": 2,
            "scene_info_mpath": "{scene:02}/info.json",
            "scene_gt_mpath": "{scene:02}/gt.json",
            "test_depth_mpath": "{scene:02}/depth/{im:04}.png"
        },
        "tolerance": 15.0,
        "render_debug_overlay": overlays,
        "output": {
            "stats_mpath": format!("{}/{{scene:02}}/gt_stats_delta={{delta}}.json", out.display()),
            "vis_mpath": format!("{}/vis/{{scene:02}}/{{im:04}}_{{gt:02}}.png", out.display()),
        }
    })
}
