//! Error normalizer
//!
//! Runtime failures pick up an internal frame every time they pass through
//! the fragment dispatcher. Before a failure leaves a render boundary those
//! frames are dropped, so the surfaced trace only names template locations.

use crate::error::RenderError;

/// Drop internal frames from a runtime trace, always keeping the first frame
///
/// Non-runtime errors are returned unchanged.
pub fn normalize(error: RenderError) -> RenderError {
    match error {
        RenderError::Runtime { message, trace } => {
            let trace = trace
                .into_iter()
                .enumerate()
                .filter(|(index, frame)| *index == 0 || !frame.is_internal())
                .map(|(_, frame)| frame)
                .collect();
            RenderError::Runtime { message, trace }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Frame;
    use std::path::Path;

    #[test]
    fn test_strips_internal_frames_after_first() {
        let err = RenderError::runtime("x is not defined", Frame::template(Path::new("/v/a"), 1, 3))
            .with_frame(Frame::Internal("dispatch"))
            .with_frame(Frame::template(Path::new("/v/b"), 4, 1))
            .with_frame(Frame::Internal("dispatch"));

        let normalized = normalize(err);
        assert_eq!(
            normalized.trace(),
            &[
                Frame::template(Path::new("/v/a"), 1, 3),
                Frame::template(Path::new("/v/b"), 4, 1),
            ]
        );
    }

    #[test]
    fn test_keeps_leading_internal_frame() {
        let err = RenderError::Runtime {
            message: "boom".to_string(),
            trace: vec![Frame::Internal("dispatch"), Frame::Internal("dispatch")],
        };
        assert_eq!(normalize(err).trace(), &[Frame::Internal("dispatch")]);
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = normalize(RenderError::Config("bad".to_string()));
        assert!(matches!(err, RenderError::Config(message) if message == "bad"));
    }
}
