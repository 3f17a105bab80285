use crate::error::ConfigError;

pub trait Square {
    fn side(&self) -> usize;
    fn num_elems(&self) -> usize {
        self.side() * self.side()
    }
}

/// A descriptor for a square buffer of samples
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SquareShape {
    side: usize,
}

impl SquareShape {
    pub fn from_side(side: usize) -> SquareShape {
        SquareShape { side }
    }
}

impl Square for SquareShape {
    fn side(&self) -> usize {
        self.side
    }
}

/// A descriptor for the geometry of one patch passing through
/// convolution, pooling and decimation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PatchGeometry {
    patch_width: usize,
    kernel_width: usize,
    pool_window: usize,
    stride: usize,
}

impl PatchGeometry {
    /// Creates the geometry, rejecting shapes that produce no output.
    pub fn new(
        patch_width: usize,
        kernel_width: usize,
        pool_window: usize,
        stride: usize,
    ) -> Result<PatchGeometry, ConfigError> {
        for &(name, value) in &[
            ("patch width", patch_width),
            ("kernel width", kernel_width),
            ("pool window", pool_window),
            ("subsample stride", stride),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDimension { name });
            }
        }
        if kernel_width > patch_width {
            return Err(ConfigError::KernelWiderThanPatch {
                kernel_width,
                patch_width,
            });
        }
        let geometry = PatchGeometry {
            patch_width,
            kernel_width,
            pool_window,
            stride,
        };
        if geometry.accumulator().side() == 0 {
            return Err(ConfigError::EmptyAccumulator {
                stride,
                conv_side: geometry.conv().side(),
            });
        }
        Ok(geometry)
    }

    pub fn patch(&self) -> SquareShape {
        SquareShape::from_side(self.patch_width)
    }
    pub fn kernel(&self) -> SquareShape {
        SquareShape::from_side(self.kernel_width)
    }
    /// Output of the valid convolution, also the side pooling and decimation work on.
    pub fn conv(&self) -> SquareShape {
        SquareShape::from_side(self.patch_width - self.kernel_width + 1)
    }
    /// Decimated map, and the tile written to the output map.
    pub fn accumulator(&self) -> SquareShape {
        SquareShape::from_side(self.conv().side() / self.stride)
    }
    pub fn pool_window(&self) -> usize {
        self.pool_window
    }
    pub fn stride(&self) -> usize {
        self.stride
    }
}
