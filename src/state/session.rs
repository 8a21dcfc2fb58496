use crate::models::{ImputationMethod, ParameterError, RequestParameters, SelectedFile};

/// The single file slot plus the parameters the next submission will use.
///
/// Owned by [`super::ProcessingWorkflow`]; the workflow decides when the slot
/// may change.
#[derive(Clone, Debug, Default)]
pub struct UploadSession {
    file: Option<SelectedFile>,
    params: RequestParameters,
}

impl UploadSession {
    pub fn new(params: RequestParameters) -> Self {
        Self { file: None, params }
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn params(&self) -> RequestParameters {
        self.params
    }

    pub fn set_method(&mut self, method: ImputationMethod) {
        self.params = self.params.with_method(method);
    }

    /// Set the iteration count from user text. The old value is kept on error.
    pub fn set_iterations_text(&mut self, text: &str) -> Result<(), ParameterError> {
        self.params = self.params.with_iterations_text(text)?;
        Ok(())
    }

    pub(super) fn replace_file(&mut self, file: SelectedFile) -> Option<SelectedFile> {
        self.file.replace(file)
    }

    pub(super) fn take_file(&mut self) -> Option<SelectedFile> {
        self.file.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_edits() {
        let mut session = UploadSession::new(RequestParameters::default());
        session.set_method(ImputationMethod::Pmm);
        session.set_iterations_text("30").unwrap();
        assert_eq!(session.params().method(), ImputationMethod::Pmm);
        assert_eq!(session.params().iterations(), 30);

        assert!(session.set_iterations_text("zero").is_err());
        assert_eq!(session.params().iterations(), 30);
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = UploadSession::default();
        assert!(session.file().is_none());
        assert_eq!(session.params(), RequestParameters::default());
    }
}
