/// clxor – repeating-key XOR masking on an OpenCL device.
///
///   clxor data.bin key.bin            → mask to data.bin.xor
///   clxor -o out.bin data.bin key.bin → mask to out.bin
///   clxor -c data.bin key.bin         → mask to stdout
///   clxor -K custom.cl data.bin key.bin
///                                     → use external transform source
///   clxor --probe                     → list compute devices and exit
///
/// Applying the same key twice recovers the original file.
use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process::{self, ExitCode};
use std::time::Instant;

use clxor::device::{self, DeviceClass};
use clxor::engine::{EngineOptions, XorEngine, XOR_ENTRY_POINT, XOR_KERNEL_SOURCE};
use clxor::{io as payload_io, ClxorError, ClxorResult};

fn usage() {
    eprintln!("clxor - repeating-key XOR masking on an OpenCL device");
    eprintln!();
    eprintln!("Usage: clxor [OPTIONS] DATA KEY");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -o, --output PATH  Output path (default: DATA.xor)");
    eprintln!("  -c, --stdout       Write masked bytes to stdout");
    eprintln!("  -f, --force        Overwrite an existing output file");
    eprintln!("  -K, --kernel PATH  Transform source file (default: embedded)");
    eprintln!("  -e, --entry NAME   Transform entry point (default: {XOR_ENTRY_POINT})");
    eprintln!("  -D, --device CLASS Device class: default|gpu|cpu|accelerator");
    eprintln!("      --probe        List compute devices and exit");
    eprintln!("  -q, --quiet        Suppress diagnostics");
    eprintln!("  -v, --verbose      Print per-event device timings");
    eprintln!("  -h, --help         Show this help");
}

fn probe() {
    let devices = device::probe_devices();
    if devices.is_empty() {
        eprintln!("clxor: no OpenCL devices found");
        return;
    }
    println!("{:>4} {:>6} {:>10} {:>12}  name", "type", "CUs", "max-wg", "global-mem");
    for d in &devices {
        let kind = if d.is_gpu { "gpu" } else { "cpu" };
        println!(
            "{:>4} {:>6} {:>10} {:>9} MiB  {} ({})",
            kind,
            d.compute_units,
            d.max_work_group_size,
            d.global_mem_size / (1024 * 1024),
            d.name,
            d.vendor,
        );
    }
}

#[derive(Debug)]
struct Opts {
    output: Option<String>,
    to_stdout: bool,
    force: bool,
    kernel: Option<String>,
    entry: String,
    device: DeviceClass,
    probe: bool,
    verbose: bool,
    quiet: bool,
    paths: Vec<String>,
}

fn parse_args() -> Opts {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut opts = Opts {
        output: None,
        to_stdout: false,
        force: false,
        kernel: None,
        entry: XOR_ENTRY_POINT.to_string(),
        device: DeviceClass::Default,
        probe: false,
        verbose: false,
        quiet: false,
        paths: Vec::new(),
    };

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-c" | "--stdout" | "--to-stdout" => opts.to_stdout = true,
            "-f" | "--force" => opts.force = true,
            "--probe" => opts.probe = true,
            "-v" | "--verbose" => opts.verbose = true,
            "-q" | "--quiet" => opts.quiet = true,
            "-h" | "--help" => {
                usage();
                process::exit(0);
            }
            "-o" | "--output" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("clxor: missing argument for -o");
                    process::exit(1);
                }
                opts.output = Some(args[i].clone());
            }
            "-K" | "--kernel" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("clxor: missing argument for -K");
                    process::exit(1);
                }
                opts.kernel = Some(args[i].clone());
            }
            "-e" | "--entry" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("clxor: missing argument for -e");
                    process::exit(1);
                }
                opts.entry = args[i].clone();
            }
            "-D" | "--device" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("clxor: missing argument for -D");
                    process::exit(1);
                }
                opts.device = match args[i].as_str() {
                    "default" => DeviceClass::Default,
                    "gpu" => DeviceClass::Gpu,
                    "cpu" => DeviceClass::Cpu,
                    "accelerator" => DeviceClass::Accelerator,
                    other => {
                        eprintln!("clxor: unknown device class '{other}'");
                        eprintln!("clxor: expected default, gpu, cpu, or accelerator");
                        process::exit(1);
                    }
                };
            }
            // Handle combined short flags like -cf, -qv, etc.
            s if s.starts_with('-') && !s.starts_with("--") && s.len() > 2 => {
                for ch in s[1..].chars() {
                    match ch {
                        'c' => opts.to_stdout = true,
                        'f' => opts.force = true,
                        'v' => opts.verbose = true,
                        'q' => opts.quiet = true,
                        _ => {
                            eprintln!("clxor: unknown flag '-{ch}'");
                            process::exit(1);
                        }
                    }
                }
            }
            _ => {
                opts.paths.push(arg.clone());
            }
        }
        i += 1;
    }

    opts
}

fn run(opts: &Opts) -> ClxorResult<()> {
    let data_path = &opts.paths[0];
    let key_path = &opts.paths[1];

    // Load the transform source, data, and key payloads up front;
    // nothing touches the device until all three are in memory.
    let source = match &opts.kernel {
        Some(path) => payload_io::read_all_text(path)?,
        None => XOR_KERNEL_SOURCE.to_string(),
    };
    let mut data = payload_io::read_all_bytes(data_path)?;
    let key = payload_io::read_all_bytes(key_path)?;

    if !opts.quiet {
        eprintln!("clxor: found {} platforms", device::platform_count());
        eprintln!("clxor: data: {} bytes, key: {} bytes", data.len(), key.len());
    }

    let engine_opts = EngineOptions {
        device_class: opts.device,
        profiling: opts.verbose,
    };
    let engine = XorEngine::with_kernel_source(&engine_opts, &source, &opts.entry)?;

    if !opts.quiet {
        // Reporting failures never abort a run
        match device::describe_device(engine.device()) {
            Ok(summary) => eprintln!("clxor: using {summary}"),
            Err(e) => eprintln!("clxor: warning: {e}"),
        }
    }

    let started = Instant::now();
    engine.apply_in_place(&mut data, &key)?;
    let elapsed = started.elapsed();

    if !opts.quiet {
        eprintln!("clxor: device pipeline ran in {:.6} seconds", elapsed.as_secs_f64());
    }

    if opts.to_stdout {
        io::stdout()
            .write_all(&data)
            .map_err(|e| ClxorError::Io(format!("stdout: {e}")))?;
        return Ok(());
    }

    let out_path = match &opts.output {
        Some(path) => path.clone(),
        None => format!("{data_path}.xor"),
    };
    if Path::new(&out_path).exists() && !opts.force {
        return Err(ClxorError::Io(format!(
            "{out_path}: already exists; use -f to overwrite"
        )));
    }
    payload_io::write_all_bytes(&out_path, &data)?;

    if !opts.quiet {
        eprintln!("clxor: wrote {} bytes to {out_path}", data.len());
    }
    Ok(())
}

fn main() -> ExitCode {
    let opts = parse_args();

    if opts.probe {
        probe();
        return ExitCode::SUCCESS;
    }

    if opts.paths.len() != 2 {
        usage();
        return ExitCode::FAILURE;
    }

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        // Build failures get their own exit code and the captured
        // compiler log on stderr.
        Err(ClxorError::Build(log)) => {
            eprintln!("clxor: program build failed");
            eprintln!("{log}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("clxor: {e}");
            ExitCode::FAILURE
        }
    }
}
