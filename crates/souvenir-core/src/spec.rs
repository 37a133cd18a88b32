use crate::{ContractError, DType, NormalizedTensor, Shape};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IOName(pub String);

#[derive(Clone, Debug)]
pub struct TensorSpec {
    pub name: IOName,
    pub dtype: DType,
    pub rank: usize,
    pub dims: Vec<Option<usize>>, // None = dynamic
}

impl TensorSpec {
    /// True when every static dimension agrees with `shape`.
    pub fn accepts(&self, shape: &Shape) -> bool {
        self.rank == shape.rank()
            && self
                .dims
                .iter()
                .zip(shape.dims())
                .all(|(declared, actual)| declared.map_or(true, |d| d == *actual))
    }
}

#[derive(Clone, Debug)]
pub struct ModelSpec {
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

impl ModelSpec {
    /// Spec of a single-input classifier over `num_classes` labels.
    #[cfg(any(test, feature = "test-support"))]
    pub fn image_classifier(num_classes: usize) -> Self {
        Self {
            inputs: vec![TensorSpec {
                name: IOName("input".to_string()),
                dtype: DType::F32,
                rank: 4,
                dims: vec![None, Some(224), Some(224), Some(3)],
            }],
            outputs: vec![TensorSpec {
                name: IOName("scores".to_string()),
                dtype: DType::F32,
                rank: 2,
                dims: vec![None, Some(num_classes)],
            }],
        }
    }

    /// Checks that the model takes one normalized image and emits one score
    /// per label. Dynamic dimensions are accepted.
    pub fn check_classifier_contract(&self, num_labels: usize) -> Result<(), ContractError> {
        let [input] = self.inputs.as_slice() else {
            return Err(ContractError::InputCount(self.inputs.len()));
        };
        if input.dtype != DType::F32 {
            return Err(ContractError::InputDType(input.dtype));
        }
        let expected = Shape::from_slice(&NormalizedTensor::SHAPE);
        if !input.accepts(&expected) {
            return Err(ContractError::InputShape {
                declared: input.dims.clone(),
                expected,
            });
        }

        let output = self.outputs.first().ok_or(ContractError::NoOutputs)?;
        if let Some(Some(width)) = output.dims.last() {
            if *width != num_labels {
                return Err(ContractError::OutputWidth {
                    declared: *width,
                    labels: num_labels,
                });
            }
        }
        Ok(())
    }
}
