//! Tool error types.

/// Error returned by tool resolution or execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ToolError {
    /// No tool is registered under this name.
    #[error("Tool {0} not found")]
    NotFound(String),

    /// The arguments did not match the tool's schema.
    #[error("Invalid arguments for tool {tool}: {message}")]
    InvalidArguments {
        /// Tool name.
        tool: String,
        /// Validation messages.
        message: String,
    },

    /// The tool ran and failed.
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    /// A generic execution failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ToolError::NotFound("weather".into()).to_string(),
            "Tool weather not found"
        );
        assert_eq!(ToolError::failed("disk full").to_string(), "disk full");
        let invalid = ToolError::InvalidArguments {
            tool: "add".into(),
            message: "\"a\" is a required property".into(),
        };
        assert!(invalid.to_string().contains("add"));
    }
}
