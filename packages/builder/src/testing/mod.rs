// Testing utilities
//
// Mock implementations of the external collaborators (program, checker,
// host, cancellation token) plus a source-file builder, for exercising the
// build state without a real compiler behind it.

mod mock_program;

pub use mock_program::{
    MockHost, MockProgram, MockTypeChecker, SourceFileBuilder, TestCancellationToken,
};
