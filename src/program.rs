//! Transform program compilation and entry-point resolution.
//!
//! Source text is compiled against the selected device only. On build
//! failure the compiler's build log is retrieved and carried in the
//! error — a failure without its log is useless to whoever wrote the
//! kernel. The log capture is bounded so a pathological compiler can't
//! balloon the error.

use opencl3::context::Context;
use opencl3::device::Device;
use opencl3::kernel::Kernel;
use opencl3::program::Program;

use crate::{ClxorError, ClxorResult};

/// Upper bound on captured build-log bytes.
const BUILD_LOG_CAP: usize = 2048;

/// Compile `source` for `device` and resolve `entry_point` into a
/// dispatchable kernel.
///
/// Returns the program alongside the kernel so the caller controls
/// release order (kernel before program). An entry-point name absent
/// from the source fails with `Build` at kernel creation rather than
/// silently doing nothing.
pub fn build_kernel(
    context: &Context,
    device: &Device,
    source: &str,
    entry_point: &str,
) -> ClxorResult<(Program, Kernel)> {
    let mut program = Program::create_from_source(context, source)
        .map_err(|e| ClxorError::Build(format!("create program: {e}")))?;

    if let Err(e) = program.build(&[device.id()], "-Werror") {
        let log = capture_build_log(&program, device);
        return Err(ClxorError::Build(format!("{e}\n{log}")));
    }

    let kernel = Kernel::create(&program, entry_point)
        .map_err(|e| ClxorError::Build(format!("entry point '{entry_point}': {e}")))?;

    Ok((program, kernel))
}

/// Retrieve the build log for `device`, truncated to `BUILD_LOG_CAP`.
fn capture_build_log(program: &Program, device: &Device) -> String {
    let log = program
        .get_build_log(device.id())
        .unwrap_or_else(|_| String::from("(build log unavailable)"));
    truncate_log(log)
}

fn truncate_log(mut log: String) -> String {
    if log.len() > BUILD_LOG_CAP {
        let mut end = BUILD_LOG_CAP;
        // back off to a char boundary
        while !log.is_char_boundary(end) {
            end -= 1;
        }
        log.truncate(end);
    }
    log
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_log_short() {
        let log = truncate_log(String::from("warning: unused variable"));
        assert_eq!(log, "warning: unused variable");
    }

    #[test]
    fn test_truncate_log_caps_length() {
        let log = truncate_log("x".repeat(BUILD_LOG_CAP * 2));
        assert_eq!(log.len(), BUILD_LOG_CAP);
    }

    #[test]
    fn test_truncate_log_char_boundary() {
        // Multi-byte characters straddling the cap must not split
        let log = truncate_log("é".repeat(BUILD_LOG_CAP));
        assert!(log.len() <= BUILD_LOG_CAP);
        assert!(log.is_char_boundary(log.len()));
    }
}
