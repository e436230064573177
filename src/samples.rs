use image::{ Rgb, RgbImage };
use serde_json::{ json, Map, Value };
use tracing::info;

use crate::engine::SearchEngine;
use crate::error::Result;
use crate::media;

struct SampleText {
    text: &'static str,
    category: &'static str,
    tags: [&'static str; 3],
}

const SAMPLE_TEXTS: &[SampleText] = &[
    SampleText {
        text: "A beautiful red sunset over the ocean with golden reflections on the water",
        category: "nature",
        tags: ["sunset", "ocean", "red"],
    },
    SampleText {
        text: "A red sports car speeding down a highway at sunset",
        category: "vehicles",
        tags: ["car", "red", "sunset"],
    },
    SampleText {
        text: "A red rose blooming in a garden with morning dew",
        category: "nature",
        tags: ["flower", "red", "garden"],
    },
    SampleText {
        text: "A red apple on a wooden table with natural lighting",
        category: "food",
        tags: ["fruit", "red", "still life"],
    },
    SampleText {
        text: "A red balloon floating in a clear blue sky",
        category: "objects",
        tags: ["balloon", "red", "sky"],
    },
    SampleText {
        text: "A red brick building with modern architecture",
        category: "architecture",
        tags: ["building", "red", "modern"],
    },
    SampleText {
        text: "A red dress hanging in a boutique window",
        category: "fashion",
        tags: ["clothing", "red", "retail"],
    },
    SampleText {
        text: "A red fire truck responding to an emergency",
        category: "vehicles",
        tags: ["truck", "red", "emergency"],
    },
    SampleText {
        text: "A red stop sign at a busy intersection",
        category: "street",
        tags: ["sign", "red", "traffic"],
    },
    SampleText {
        text: "A red umbrella in the rain on a city street",
        category: "street",
        tags: ["umbrella", "red", "rain"],
    },
];

const SAMPLE_IMAGE_SIZE: u32 = 224;
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// White figure drawn inside the box (50, 50)..=(174, 174).
#[derive(Debug, Clone, Copy)]
enum Shape {
    Square,
    Circle,
    Triangle,
}

impl Shape {
    fn covers(self, x: u32, y: u32) -> bool {
        let (x, y) = (x as f32, y as f32);
        match self {
            Shape::Square => (50.0..=174.0).contains(&x) && (50.0..=174.0).contains(&y),
            Shape::Circle => (x - 112.0).powi(2) + (y - 112.0).powi(2) <= 62.0_f32.powi(2),
            Shape::Triangle => {
                let corners = [(112.0, 50.0), (174.0, 174.0), (50.0, 174.0)];
                let sides: Vec<f32> = (0..3)
                    .map(|i| {
                        let (ax, ay) = corners[i];
                        let (bx, by) = corners[(i + 1) % 3];
                        (bx - ax) * (y - ay) - (by - ay) * (x - ax)
                    })
                    .collect();
                sides.iter().all(|&s| s >= 0.0) || sides.iter().all(|&s| s <= 0.0)
            }
        }
    }
}

struct SampleImage {
    file_name: &'static str,
    description: &'static str,
    background: [u8; 3],
    shape: Shape,
    tags: [&'static str; 3],
}

const SAMPLE_IMAGES: &[SampleImage] = &[
    SampleImage {
        file_name: "red_square.png",
        description: "A red image with white square",
        background: [255, 0, 0],
        shape: Shape::Square,
        tags: ["red", "square", "pattern"],
    },
    SampleImage {
        file_name: "blue_circle.png",
        description: "A blue image with white circle",
        background: [0, 0, 255],
        shape: Shape::Circle,
        tags: ["blue", "circle", "pattern"],
    },
    SampleImage {
        file_name: "green_triangle.png",
        description: "A green image with white triangle",
        background: [0, 128, 0],
        shape: Shape::Triangle,
        tags: ["green", "triangle", "pattern"],
    },
];

fn metadata(category: &str, tags: &[&str]) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("category".to_string(), json!(category));
    metadata.insert("tags".to_string(), json!(tags));
    metadata
}

fn draw_sample(sample: &SampleImage) -> RgbImage {
    RgbImage::from_fn(SAMPLE_IMAGE_SIZE, SAMPLE_IMAGE_SIZE, |x, y| {
        if sample.shape.covers(x, y) { WHITE } else { Rgb(sample.background) }
    })
}

/// Index the bundled sample captions and pattern images. Returns how many documents were added.
pub async fn seed(engine: &SearchEngine) -> Result<usize> {
    for sample in SAMPLE_TEXTS {
        let response = engine.index_text(sample.text, Some(metadata(sample.category, &sample.tags))).await?;
        info!(id = %response.id, "indexed sample: {:.50}", sample.text);
    }

    for sample in SAMPLE_IMAGES {
        let bytes = media::encode_png(&draw_sample(sample))?;
        let response = engine.index_image(
            &bytes,
            Some(sample.file_name),
            Some(metadata("color", &sample.tags))
        ).await?;
        info!(id = %response.id, "indexed sample image: {}", sample.description);
    }

    Ok(SAMPLE_TEXTS.len() + SAMPLE_IMAGES.len())
}
