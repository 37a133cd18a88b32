use anyhow::{bail, ensure, Context, Result};
use ort::{
    session::{builder::SessionBuilder, Session, SessionInputValue},
    tensor::TensorElementType,
    value::ValueType,
};
use souvenir_core::{
    Backend, ClassScores, ClassifierModel, DType, Device, IOName, ModelArtifact, ModelSpec,
    NormalizedTensor, Shape, TensorSpec,
};

pub struct OrtBackend;

impl OrtBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrtBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct OrtModel {
    spec: ModelSpec,
    session: Session,
    input_name: String,
}

impl Backend for OrtBackend {
    type Model = OrtModel;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model> {
        let ModelArtifact::OnnxPath(path) = artifact;
        ensure!(path.is_file(), "model file {} does not exist", path.display());

        let builder = Session::builder()
            .context("failed to create ORT session builder")?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .context("failed to configure ORT session builder")?;

        let builder = configure_session_builder(builder, &device)?;

        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("failed to load ONNX model {}", path.display()))?;

        let spec = build_model_spec(&session)?;
        let input_name = spec
            .inputs
            .first()
            .map(|input| input.name.0.clone())
            .context("ONNX model declares no inputs")?;

        Ok(OrtModel {
            spec,
            session,
            input_name,
        })
    }
}

impl ClassifierModel for OrtModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn predict(&mut self, input: &NormalizedTensor) -> Result<ClassScores> {
        let shape: Vec<usize> = input.shape().dims().to_vec();
        let value = ort::value::Tensor::from_array((shape, input.as_slice().to_vec()))?.into_dyn();
        let ort_inputs = vec![(self.input_name.clone(), SessionInputValue::from(value))];

        let outputs = self.session.run(ort_inputs)?;
        let (_, scores) = outputs.iter().next().context("model produced no outputs")?;
        scores_from_value(&scores)
    }
}

fn build_model_spec(session: &Session) -> Result<ModelSpec> {
    let inputs = session
        .inputs
        .iter()
        .map(|input| tensor_spec_from_value_type(&input.name, &input.input_type))
        .collect::<Result<Vec<_>>>()?;

    let outputs = session
        .outputs
        .iter()
        .map(|output| tensor_spec_from_value_type(&output.name, &output.output_type))
        .collect::<Result<Vec<_>>>()?;

    Ok(ModelSpec { inputs, outputs })
}

fn configure_session_builder(builder: SessionBuilder, device: &Device) -> Result<SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        Device::Cuda { device_id } => configure_cuda(builder, *device_id),
    }
}

fn configure_cuda(builder: SessionBuilder, device_id: u32) -> Result<SessionBuilder> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::cuda::CUDAExecutionProvider;
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32)
            .build();
        builder
            .with_execution_providers([ep])
            .context("failed to enable ORT CUDA execution provider")
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = (builder, device_id);
        bail!("CUDA requested but souvenir-backend-ort was built without the `cuda` feature")
    }
}

fn tensor_spec_from_value_type(name: &str, value_type: &ValueType) -> Result<TensorSpec> {
    let ValueType::Tensor { ty, shape, .. } = value_type else {
        bail!("unsupported non-tensor IO value type");
    };

    let dtype = ort_tensor_element_to_dtype(*ty)?;
    let dims = shape
        .iter()
        .map(|d| if *d < 0 { None } else { Some(*d as usize) })
        .collect::<Vec<_>>();

    Ok(TensorSpec {
        name: IOName(name.to_string()),
        dtype,
        rank: shape.len(),
        dims,
    })
}

fn ort_tensor_element_to_dtype(ty: TensorElementType) -> Result<DType> {
    match ty {
        TensorElementType::Float32 => Ok(DType::F32),
        TensorElementType::Float16 => Ok(DType::F16),
        TensorElementType::Int64 => Ok(DType::I64),
        TensorElementType::Int32 => Ok(DType::I32),
        TensorElementType::Uint8 => Ok(DType::U8),
        _ => bail!("unsupported tensor element type: {ty}"),
    }
}

// Accepts `[classes]` or `[1, classes]`; anything carrying more than one row
// means the graph is not a single-image classifier.
fn scores_from_value(value: &ort::value::ValueRef<'_>) -> Result<ClassScores> {
    let ValueType::Tensor { ty, shape, .. } = value.dtype() else {
        bail!("non-tensor outputs are not supported");
    };
    ensure!(
        *ty == TensorElementType::Float32,
        "expected f32 scores, model returned {ty}"
    );

    let dims: Vec<usize> = shape.iter().map(|d| (*d).max(0) as usize).collect();
    let observed = Shape::from_slice(&dims);
    ensure!(
        matches!(dims.as_slice(), [_] | [1, _]),
        "expected score shape [1, classes], got {observed}"
    );

    let array = value.try_extract_array::<f32>()?;
    Ok(ClassScores(array.iter().copied().collect()))
}
