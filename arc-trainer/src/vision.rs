//! Image captioning
//!
//! [`HuggingFaceCaptioner`] calls a hosted BLIP endpoint. [`GridDescriber`]
//! works offline: it maps pixels back onto the ARC palette and describes the
//! size and colour make-up of the picture.

use crate::arc::render::{CELL_SIZE, PALETTE};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub const COLOUR_NAMES: [&str; 10] = [
    "black", "blue", "red", "green", "yellow", "grey", "magenta", "orange", "azure", "maroon",
];

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("caption request failed: {0}")]
    Network(String),
    #[error("caption service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("caption reply has no generated_text")]
    MissingCaption,
    #[error("image could not be decoded: {0}")]
    Image(#[from] image::ImageError),
}

impl From<reqwest::Error> for CaptionError {
    fn from(err: reqwest::Error) -> Self {
        CaptionError::Network(err.to_string())
    }
}

#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image: &[u8], file_name: &str) -> Result<String, CaptionError>;
}

pub struct HuggingFaceCaptioner {
    http: reqwest::Client,
    endpoint: String,
    bearer_token: String,
}

impl HuggingFaceCaptioner {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            bearer_token: bearer_token.into(),
        }
    }

    /// Inference endpoints answer either `[{"generated_text"}]` or `{"generated_text"}`
    fn extract(reply: &Value) -> Option<String> {
        let holder = match reply {
            Value::Array(items) => items.first()?,
            other => other,
        };
        holder
            .get("generated_text")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
    }
}

#[async_trait]
impl Captioner for HuggingFaceCaptioner {
    async fn caption(&self, image: &[u8], file_name: &str) -> Result<String, CaptionError> {
        let part = reqwest::multipart::Part::bytes(image.to_vec()).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.bearer_token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CaptionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: Value = response.json().await?;
        let caption = Self::extract(&reply).ok_or(CaptionError::MissingCaption)?;
        tracing::debug!("Caption for {}: {}", file_name, caption);
        Ok(caption)
    }
}

/// Offline captioner for rendered grids and simple images
#[derive(Debug, Default, Clone, Copy)]
pub struct GridDescriber;

impl GridDescriber {
    fn nearest_colour(rgb: [u8; 3]) -> usize {
        PALETTE
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| {
                p.iter()
                    .zip(rgb.iter())
                    .map(|(&a, &b)| (i32::from(a) - i32::from(b)).pow(2))
                    .sum::<i32>()
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Describe colour shares, largest first
    fn describe_counts(counts: &BTreeMap<usize, usize>) -> String {
        let total: usize = counts.values().sum();
        let mut ranked: Vec<(usize, usize)> = counts.iter().map(|(&c, &n)| (c, n)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .iter()
            .map(|(colour, n)| {
                format!(
                    "{} ({}%)",
                    COLOUR_NAMES[*colour],
                    (n * 100 + total / 2) / total.max(1)
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn describe(&self, image: &[u8]) -> Result<String, CaptionError> {
        let img = image::load_from_memory(image)?.to_rgb8();
        let (width, height) = img.dimensions();
        let mut counts = BTreeMap::new();

        let is_grid = width > 0
            && height > 0
            && width % CELL_SIZE == 0
            && height % CELL_SIZE == 0;

        if is_grid {
            let (cols, rows) = (width / CELL_SIZE, height / CELL_SIZE);
            for row in 0..rows {
                for col in 0..cols {
                    let px = img.get_pixel(col * CELL_SIZE + CELL_SIZE / 2, row * CELL_SIZE + CELL_SIZE / 2);
                    *counts.entry(Self::nearest_colour(px.0)).or_insert(0) += 1;
                }
            }
            Ok(format!(
                "A {} by {} grid of coloured cells: {}",
                rows,
                cols,
                Self::describe_counts(&counts)
            ))
        } else {
            for px in img.pixels() {
                *counts.entry(Self::nearest_colour(px.0)).or_insert(0) += 1;
            }
            Ok(format!(
                "A {} by {} pixel image, mostly {}",
                width,
                height,
                Self::describe_counts(&counts)
            ))
        }
    }
}

#[async_trait]
impl Captioner for GridDescriber {
    async fn caption(&self, image: &[u8], _file_name: &str) -> Result<String, CaptionError> {
        self.describe(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::{render_png, Grid};

    #[test]
    fn test_describes_rendered_grid() {
        let grid = Grid::new(vec![vec![0, 0], vec![1, 0]]).unwrap();
        let caption = GridDescriber.describe(&render_png(&grid).unwrap()).unwrap();
        assert_eq!(caption, "A 2 by 2 grid of coloured cells: black (75%), blue (25%)");
    }

    #[test]
    fn test_describes_plain_image() {
        let img = image::RgbImage::from_pixel(7, 5, image::Rgb([250, 60, 50]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        let caption = GridDescriber.describe(&bytes).unwrap();
        assert_eq!(caption, "A 7 by 5 pixel image, mostly red (100%)");
    }

    #[test]
    fn test_rejects_non_image() {
        assert!(matches!(GridDescriber.describe(b"not a png"), Err(CaptionError::Image(_))));
    }

    #[test]
    fn test_extract_caption_shapes() {
        let array = serde_json::json!([{"generated_text": " a cat "}]);
        let object = serde_json::json!({"generated_text": "a dog"});
        assert_eq!(HuggingFaceCaptioner::extract(&array), Some("a cat".into()));
        assert_eq!(HuggingFaceCaptioner::extract(&object), Some("a dog".into()));
        assert_eq!(HuggingFaceCaptioner::extract(&serde_json::json!({})), None);
    }
}
