use std::fmt;

use smallvec::SmallVec;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda { device_id: u32 },
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda { device_id } => write!(f, "cuda:{device_id}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DType {
    F32,
    F16,
    I64,
    I32,
    U8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }
    pub fn rank(&self) -> usize {
        self.0.len()
    }
    pub fn dims(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0.as_slice())
    }
}

/// Side length of the square image the classifier consumes.
pub const INPUT_SIZE: usize = 224;
pub const INPUT_CHANNELS: usize = 3;

/// Model input: one 224x224 RGB image in NHWC order, every value in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedTensor {
    data: Vec<f32>,
}

impl NormalizedTensor {
    pub const SHAPE: [usize; 4] = [1, INPUT_SIZE, INPUT_SIZE, INPUT_CHANNELS];
    pub const NUMEL: usize = INPUT_SIZE * INPUT_SIZE * INPUT_CHANNELS;

    pub(crate) fn from_unit_values(data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), Self::NUMEL);
        Self { data }
    }

    #[cfg(test)]
    fn filled(value: f32) -> Self {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        Self {
            data: vec![value; Self::NUMEL],
        }
    }

    pub fn shape(&self) -> Shape {
        Shape::from_slice(&Self::SHAPE)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Value at `(y, x, c)` of the single batch entry.
    pub fn pixel(&self, y: usize, x: usize, c: usize) -> Option<f32> {
        if y >= INPUT_SIZE || x >= INPUT_SIZE || c >= INPUT_CHANNELS {
            return None;
        }
        self.data
            .get((y * INPUT_SIZE + x) * INPUT_CHANNELS + c)
            .copied()
    }
}

/// Raw per-class scores, index-aligned with the label table.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassScores(pub Vec<f32>);

impl ClassScores {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Index and value of the highest score. Ties go to the lowest index.
    /// Returns `None` for an empty vector or when any score is not finite.
    pub fn argmax(&self) -> Option<(usize, f32)> {
        if self.0.iter().any(|s| !s.is_finite()) {
            return None;
        }
        self.0
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (idx, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((idx, score)),
            })
    }
}

impl From<Vec<f32>> for ClassScores {
    fn from(scores: Vec<f32>) -> Self {
        Self(scores)
    }
}
