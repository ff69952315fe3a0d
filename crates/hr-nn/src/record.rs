// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Packing of original / similar / different images into one training record.
//!
//! Frames arrive as interleaved `HWC` bytes. A record stores them planar
//! (`CHW`) one after another, so the record has `3 * channels` planes:
//! original in `[0, c)`, similar in `[c, 2c)` and different in `[2c, 3c)`.

use crate::batch::TripletRole;
use crate::{PureResult, TensorError};
use serde::{Deserialize, Serialize};

/// Label stamped on packed triplet records.
pub const TRIPLET_LABEL: i32 = 1;

/// Decoded 8-bit image with interleaved channels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFrame {
    height: usize,
    width: usize,
    channels: usize,
    pixels: Vec<u8>,
}

impl ImageFrame {
    pub fn new(height: usize, width: usize, channels: usize, pixels: Vec<u8>) -> PureResult<Self> {
        if height == 0 || width == 0 || channels == 0 {
            return Err(TensorError::InvalidDimensions {
                rows: height,
                cols: width * channels,
            });
        }
        let expected = height * width * channels;
        if pixels.len() != expected {
            return Err(TensorError::DataLength {
                expected,
                got: pixels.len(),
            });
        }
        Ok(Self {
            height,
            width,
            channels,
            pixels,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Shape viewed as a `height x (width * channels)` matrix.
    fn matrix_shape(&self) -> (usize, usize) {
        (self.height, self.width * self.channels)
    }
}

/// Three frames packed planar into a single record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripletRecord {
    channels: usize,
    height: usize,
    width: usize,
    label: i32,
    data: Vec<u8>,
}

impl TripletRecord {
    /// Packs three frames of identical geometry.
    pub fn pack(
        original: &ImageFrame,
        similar: &ImageFrame,
        different: &ImageFrame,
    ) -> PureResult<Self> {
        for other in [similar, different] {
            let same_geometry = other.channels == original.channels
                && other.matrix_shape() == original.matrix_shape();
            if !same_geometry {
                return Err(TensorError::ShapeMismatch {
                    left: original.matrix_shape(),
                    right: other.matrix_shape(),
                });
            }
        }
        let (height, width, channels) = (original.height, original.width, original.channels);
        let plane = height * width;
        let mut data = vec![0u8; 3 * channels * plane];
        for (role, frame) in [original, similar, different].into_iter().enumerate() {
            for h in 0..height {
                for w in 0..width {
                    let src = (h * width + w) * channels;
                    for c in 0..channels {
                        let dst = ((role * channels + c) * height + h) * width + w;
                        data[dst] = frame.pixels[src + c];
                    }
                }
            }
        }
        Ok(Self {
            channels: 3 * channels,
            height,
            width,
            label: TRIPLET_LABEL,
            data,
        })
    }

    /// Total planes across the three frames.
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn label(&self) -> i32 {
        self.label
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Checks the geometry of a record that may come from untrusted storage.
    pub fn validate(&self) -> PureResult<()> {
        if self.channels == 0 || self.height == 0 || self.width == 0 {
            return Err(TensorError::InvalidDimensions {
                rows: self.height,
                cols: self.width * self.channels,
            });
        }
        if self.channels % 3 != 0 {
            return Err(TensorError::InvalidValue {
                label: "triplet record channels must be a multiple of three",
            });
        }
        let expected = self.channels * self.height * self.width;
        if self.data.len() != expected {
            return Err(TensorError::DataLength {
                expected,
                got: self.data.len(),
            });
        }
        Ok(())
    }

    fn role_len(&self) -> usize {
        self.channels / 3 * self.height * self.width
    }

    fn role_planes(&self, role: TripletRole) -> &[u8] {
        let len = self.role_len();
        let start = role.index() * len;
        &self.data[start..start + len]
    }

    /// Recovers the three interleaved frames.
    pub fn unpack(&self) -> PureResult<[ImageFrame; 3]> {
        self.validate()?;
        let channels = self.channels / 3;
        let (height, width) = (self.height, self.width);
        let unpack_role = |role: TripletRole| {
            let planes = self.role_planes(role);
            let mut pixels = vec![0u8; planes.len()];
            for c in 0..channels {
                for h in 0..height {
                    for w in 0..width {
                        let src = (c * height + h) * width + w;
                        pixels[(h * width + w) * channels + c] = planes[src];
                    }
                }
            }
            ImageFrame::new(height, width, channels, pixels)
        };
        Ok([
            unpack_role(TripletRole::Original)?,
            unpack_role(TripletRole::Similar)?,
            unpack_role(TripletRole::Different)?,
        ])
    }

    /// Planar pixels of each frame as `f32` rows scaled to `[0, 1]`.
    pub fn split_planes(&self) -> PureResult<[Vec<f32>; 3]> {
        self.validate()?;
        let to_row = |role: TripletRole| -> Vec<f32> {
            self.role_planes(role)
                .iter()
                .map(|&p| p as f32 / 255.0)
                .collect()
        };
        Ok([
            to_row(TripletRole::Original),
            to_row(TripletRole::Similar),
            to_row(TripletRole::Different),
        ])
    }
}
