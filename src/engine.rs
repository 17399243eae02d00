//! OpenCL compute engine: buffers, dispatch, and resource lifetime.
//!
//! `XorEngine` owns the selected device, its context, one command
//! queue, and the compiled transform kernel. Each `apply` call runs the
//! five-stage pipeline: allocate device buffers sized to the host
//! payloads, upload both, dispatch one work-item per data byte, drain
//! the queue, download the result.
//!
//! All transfers are blocking and everything goes through the single
//! queue, so upload happens before dispatch happens before download
//! without any finer-grained synchronization. Device resources release
//! by scope: per-run buffers are locals, and the engine's fields are
//! declared so that drop order runs kernel, program, queue, context.

use opencl3::command_queue::{CommandQueue, CL_QUEUE_PROFILING_ENABLE};
use opencl3::context::Context;
use opencl3::device::{Device, CL_DEVICE_TYPE_GPU};
use opencl3::event::Event;
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE};
use opencl3::program::Program;
use opencl3::types::{cl_device_type, cl_uint, CL_BLOCKING};

use std::ptr;

use crate::device::{self, DeviceClass};
use crate::program;
use crate::{ClxorError, ClxorResult};

/// Embedded transform source: repeating-key XOR, one work-item per
/// data byte.
pub const XOR_KERNEL_SOURCE: &str = include_str!("../kernels/xor.cl");

/// Entry point name in the embedded transform source.
pub const XOR_ENTRY_POINT: &str = "xor_mask";

/// Engine construction options.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Which device class to request from each platform.
    pub device_class: DeviceClass,
    /// Create the queue with `CL_QUEUE_PROFILING_ENABLE` and print
    /// per-event timings via `eprintln!`.
    pub profiling: bool,
}

/// Access mode a device buffer is tagged with at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    ReadWrite,
    ReadOnly,
}

impl Access {
    fn flags(self) -> u64 {
        match self {
            Access::ReadWrite => CL_MEM_READ_WRITE,
            Access::ReadOnly => CL_MEM_READ_ONLY,
        }
    }
}

/// Reject transfers whose host length disagrees with the buffer's
/// declared length. A mismatched copy is undefined behavior in the
/// OpenCL substrate, so the boundary check is mandatory.
fn check_transfer_len(declared: usize, offered: usize, direction: &str) -> ClxorResult<()> {
    if declared != offered {
        return Err(ClxorError::Transfer(format!(
            "{direction}: host length {offered} != declared buffer length {declared}"
        )));
    }
    Ok(())
}

/// A device-resident byte buffer with its length fixed at creation.
struct DeviceBuffer {
    buf: Buffer<u8>,
    len: usize,
}

impl DeviceBuffer {
    /// Allocate `len` device bytes under `access`.
    fn create(context: &Context, access: Access, len: usize, label: &str) -> ClxorResult<Self> {
        let buf = unsafe {
            Buffer::<u8>::create(context, access.flags(), len, ptr::null_mut())
                .map_err(|e| ClxorError::Allocation(format!("{len}-byte {label} buffer: {e}")))?
        };
        Ok(DeviceBuffer { buf, len })
    }

    /// Blocking host-to-device copy of exactly `self.len` bytes.
    fn upload(&mut self, queue: &CommandQueue, host: &[u8]) -> ClxorResult<Event> {
        check_transfer_len(self.len, host.len(), "upload")?;
        let event = unsafe {
            queue
                .enqueue_write_buffer(&mut self.buf, CL_BLOCKING, 0, host, &[])
                .map_err(|e| ClxorError::Transfer(format!("upload: {e}")))?
        };
        event
            .wait()
            .map_err(|e| ClxorError::Transfer(format!("upload: {e}")))?;
        Ok(event)
    }

    /// Blocking device-to-host copy of exactly `self.len` bytes.
    fn download(&self, queue: &CommandQueue, host: &mut [u8]) -> ClxorResult<Event> {
        check_transfer_len(self.len, host.len(), "download")?;
        let event = unsafe {
            queue
                .enqueue_read_buffer(&self.buf, CL_BLOCKING, 0, host, &[])
                .map_err(|e| ClxorError::Transfer(format!("download: {e}")))?
        };
        event
            .wait()
            .map_err(|e| ClxorError::Transfer(format!("download: {e}")))?;
        Ok(event)
    }
}

/// OpenCL compute engine for the repeating-key XOR transform.
///
/// Create one engine and reuse it across calls; device selection and
/// program compilation happen once, in the constructor.
///
/// Note: `Debug` is implemented manually because the OpenCL handle
/// types from `opencl3` don't implement `Debug`.
pub struct XorEngine {
    _device: Device,
    /// Device name for diagnostics.
    device_name: String,
    /// Maximum work-group size.
    max_work_group_size: usize,
    /// Whether the selected device is a CPU (vs GPU/accelerator).
    is_cpu: bool,
    /// Whether profiling is enabled (CL_QUEUE_PROFILING_ENABLE).
    profiling: bool,
    // Handle fields stay in this order: struct fields drop in
    // declaration order, and the kernel must release before the
    // program, the program before the queue, the queue before the
    // context.
    kernel: Kernel,
    _program: Program,
    queue: CommandQueue,
    context: Context,
}

// SAFETY: OpenCL 1.2+ guarantees thread safety for context, command queue,
// kernel, and memory objects. The raw pointers in opencl3 types are opaque
// handles to the OpenCL runtime, which serializes access internally.
unsafe impl Send for XorEngine {}
unsafe impl Sync for XorEngine {}

impl std::fmt::Debug for XorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XorEngine")
            .field("device_name", &self.device_name)
            .field("max_work_group_size", &self.max_work_group_size)
            .finish_non_exhaustive()
    }
}

impl XorEngine {
    /// Create an engine on the default device class with the embedded
    /// transform kernel.
    pub fn new() -> ClxorResult<Self> {
        Self::with_options(&EngineOptions::default())
    }

    /// Create an engine requesting a specific device class.
    pub fn with_device_class(device_class: DeviceClass) -> ClxorResult<Self> {
        Self::with_options(&EngineOptions {
            device_class,
            ..Default::default()
        })
    }

    /// Create an engine with profiling enabled.
    pub fn with_profiling(profiling: bool) -> ClxorResult<Self> {
        Self::with_options(&EngineOptions {
            profiling,
            ..Default::default()
        })
    }

    /// Create an engine with the embedded transform kernel.
    pub fn with_options(opts: &EngineOptions) -> ClxorResult<Self> {
        Self::with_kernel_source(opts, XOR_KERNEL_SOURCE, XOR_ENTRY_POINT)
    }

    /// Create an engine around arbitrary transform source text.
    ///
    /// The entry point must declare the binding contract used by
    /// `apply`: `(data buffer, key buffer, data_len uint, key_len
    /// uint)`, with the work size covering one item per data byte.
    pub fn with_kernel_source(
        opts: &EngineOptions,
        source: &str,
        entry_point: &str,
    ) -> ClxorResult<Self> {
        let candidates = device::candidate_devices(opts.device_class)?;

        let queue_props = if opts.profiling {
            CL_QUEUE_PROFILING_ENABLE
        } else {
            0
        };

        // Try each platform's candidate until one creates a context and
        // queue. A device that fails either is no better than a
        // platform with no device at all.
        let mut selected = None;
        for dev in candidates {
            let Ok(ctx) = Context::from_device(&dev) else {
                continue;
            };
            // The OpenCL 1.2 API (create_default) instead of the 2.0
            // create_default_with_properties, because macOS only
            // supports OpenCL 1.2.
            #[allow(deprecated)]
            let Ok(q) = CommandQueue::create_default(&ctx, queue_props) else {
                continue;
            };
            selected = Some((dev, ctx, q));
            break;
        }
        let (dev, context, queue) = selected.ok_or(ClxorError::NoDevice)?;

        let (program, kernel) = program::build_kernel(&context, &dev, source, entry_point)?;

        let device_name = dev.name().unwrap_or_default().trim().to_string();
        let max_work_group_size = dev.max_work_group_size().unwrap_or(1);
        let dev_type: cl_device_type = dev.dev_type().unwrap_or(0);
        let is_cpu = (dev_type & CL_DEVICE_TYPE_GPU) == 0;

        Ok(XorEngine {
            _device: dev,
            device_name,
            max_work_group_size,
            is_cpu,
            profiling: opts.profiling,
            kernel,
            _program: program,
            queue,
            context,
        })
    }

    /// Return the name of the selected compute device.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Return the selected device handle (for capability reporting).
    pub fn device(&self) -> &Device {
        &self._device
    }

    /// Return the maximum work-group size for the device.
    pub fn max_work_group_size(&self) -> usize {
        self.max_work_group_size
    }

    /// Check if the selected device is a CPU (not a GPU or accelerator).
    pub fn is_cpu_device(&self) -> bool {
        self.is_cpu
    }

    /// Whether profiling is enabled on this engine.
    pub fn profiling(&self) -> bool {
        self.profiling
    }

    /// Extract elapsed time in milliseconds from a completed OpenCL
    /// event.
    ///
    /// Requires the command queue to have been created with
    /// `CL_QUEUE_PROFILING_ENABLE`. Returns `None` if profiling is
    /// disabled or the event doesn't have timing data.
    pub fn event_elapsed_ms(event: &Event) -> Option<f64> {
        let start = event.profiling_command_start().ok()?;
        let end = event.profiling_command_end().ok()?;
        Some((end - start) as f64 / 1_000_000.0)
    }

    /// Log timing for a completed event when profiling is enabled.
    fn profile_event(&self, label: &str, event: &Event) {
        if self.profiling {
            if let Some(ms) = Self::event_elapsed_ms(event) {
                eprintln!("[clxor] {label}: {ms:.3} ms");
            }
        }
    }

    /// XOR `data` against the repeating `key` on the device, returning
    /// the masked copy.
    pub fn apply(&self, data: &[u8], key: &[u8]) -> ClxorResult<Vec<u8>> {
        let mut out = data.to_vec();
        self.apply_in_place(&mut out, key)?;
        Ok(out)
    }

    /// XOR `data` in place against the repeating `key` on the device.
    ///
    /// The full pipeline for one run: allocate a read-write data buffer
    /// and a read-only key buffer sized to the host payloads, upload
    /// both, dispatch one work-item per data byte, drain the queue,
    /// download the result back over `data`.
    pub fn apply_in_place(&self, data: &mut [u8], key: &[u8]) -> ClxorResult<()> {
        if key.is_empty() {
            return Err(ClxorError::EmptyKey);
        }
        if data.is_empty() {
            // Zero-sized dispatches are invalid; nothing to transform.
            return Ok(());
        }
        let data_len = arg_width(data.len(), "data")?;
        let key_len = arg_width(key.len(), "key")?;

        let mut data_buf =
            DeviceBuffer::create(&self.context, Access::ReadWrite, data.len(), "data")?;
        let mut key_buf = DeviceBuffer::create(&self.context, Access::ReadOnly, key.len(), "key")?;

        let event = data_buf.upload(&self.queue, data)?;
        self.profile_event("upload data", &event);
        let event = key_buf.upload(&self.queue, key)?;
        self.profile_event("upload key", &event);

        self.dispatch(&data_buf, &key_buf, data_len, key_len)?;

        let event = data_buf.download(&self.queue, data)?;
        self.profile_event("download data", &event);
        Ok(())
    }

    /// Bind arguments and enqueue the transform across a 1-D index
    /// space sized to the data length, then drain the queue.
    ///
    /// Binding order is the kernel's declared parameter list: data
    /// buffer, key buffer, data length, key length.
    fn dispatch(
        &self,
        data_buf: &DeviceBuffer,
        key_buf: &DeviceBuffer,
        data_len: cl_uint,
        key_len: cl_uint,
    ) -> ClxorResult<()> {
        let event = unsafe {
            ExecuteKernel::new(&self.kernel)
                .set_arg(&data_buf.buf)
                .set_arg(&key_buf.buf)
                .set_arg(&data_len)
                .set_arg(&key_len)
                .set_global_work_size(data_buf.len)
                .enqueue_nd_range(&self.queue)
                .map_err(|e| ClxorError::Dispatch(e.to_string()))?
        };

        // Blocking drain: all results are visible to the following
        // download once this returns.
        self.queue
            .finish()
            .map_err(|e| ClxorError::Execution(e.to_string()))?;
        self.profile_event("xor kernel", &event);
        Ok(())
    }
}

/// Narrow a host length to the kernel's 32-bit length argument.
fn arg_width(len: usize, what: &str) -> ClxorResult<cl_uint> {
    cl_uint::try_from(len)
        .map_err(|_| ClxorError::Dispatch(format!("{what} length {len} exceeds 32-bit argument")))
}
