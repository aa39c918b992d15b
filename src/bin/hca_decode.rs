//! Thin CLI front end: parse flags, decode each input file to a sibling
//! `.wav`, write to a temp file and rename into place on success.
//!
//! Grounded on Go `hcadecoder.go`'s `main` (flag-driven `Decoder` builder,
//! file-to-file loop printing `Decode: src -> dst` / `Failed: src`), using
//! `std::env::args` instead of Go's `flag` package since neither this crate
//! nor its teacher carries a CLI-parsing dependency. The "no partial output
//! on failure" rule (spec.md §7) is grounded on Go `DecodeFromFile`'s
//! `os.Remove(dst)` on failure, adapted here to a write-to-temp-then-rename
//! idiom appropriate for a filesystem boundary.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use hca::wav::SampleMode;
use hca::Decoder;

struct Args {
    mode: SampleMode,
    loop_count: u32,
    volume: f32,
    ciph_key1: u32,
    ciph_key2: u32,
    save_dir: Option<PathBuf>,
    files: Vec<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut mode = SampleMode::I16;
    let mut loop_count = 0u32;
    let mut volume = 1.0f32;
    let mut ciph_key1 = 0x30DB_E1A8u32;
    let mut ciph_key2 = 0xCC55_4639u32;
    let mut save_dir = None;
    let mut files = Vec::new();

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-m" => {
                let v: i32 = it
                    .next()
                    .ok_or("-m requires a value")?
                    .parse()
                    .map_err(|_| "-m requires an integer")?;
                mode = match v {
                    0 => SampleMode::Float32,
                    8 => SampleMode::U8,
                    16 => SampleMode::I16,
                    24 => SampleMode::I24,
                    32 => SampleMode::I32,
                    _ => return Err("unsupported -m value (expected 0/8/16/24/32)".into()),
                };
            }
            "-l" => {
                loop_count = it
                    .next()
                    .ok_or("-l requires a value")?
                    .parse()
                    .map_err(|_| "-l requires an integer")?;
            }
            "-v" => {
                volume = it
                    .next()
                    .ok_or("-v requires a value")?
                    .parse()
                    .map_err(|_| "-v requires a float")?;
            }
            "-c1" => {
                ciph_key1 = parse_hex_or_dec(&it.next().ok_or("-c1 requires a value")?)?;
            }
            "-c2" => {
                ciph_key2 = parse_hex_or_dec(&it.next().ok_or("-c2 requires a value")?)?;
            }
            "-save" => {
                save_dir = Some(PathBuf::from(it.next().ok_or("-save requires a path")?));
            }
            other => files.push(other.to_string()),
        }
    }

    Ok(Args {
        mode,
        loop_count,
        volume,
        ciph_key1,
        ciph_key2,
        save_dir,
        files,
    })
}

fn parse_hex_or_dec(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x") {
        u32::from_str_radix(hex, 16).map_err(|_| format!("invalid hex value: {s}"))
    } else {
        s.parse().map_err(|_| format!("invalid integer: {s}"))
    }
}

fn output_path(src: &str, save_dir: &Option<PathBuf>) -> PathBuf {
    let src_path = Path::new(src);
    let stem = src_path.file_stem().unwrap_or_default();
    let mut name = PathBuf::from(stem);
    name.set_extension("wav");

    match save_dir {
        Some(dir) => dir.join(name.file_name().unwrap_or_default()),
        None => src_path.with_extension("wav"),
    }
}

fn decode_one(decoder: &Decoder, src: &str, dst: &Path) -> std::io::Result<()> {
    let input = File::open(src)?;
    let mut temp_path = dst.to_path_buf();
    temp_path.set_extension("wav.tmp");

    {
        let temp_file = File::create(&temp_path)?;
        let result = decoder.decode(input, temp_file);
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, format!("{}", result.unwrap_err())));
        }
    }
    fs::rename(&temp_path, dst)
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("hca-decode: {msg}");
            return ExitCode::FAILURE;
        }
    };

    let decoder = Decoder::new()
        .mode(args.mode)
        .loop_count(args.loop_count)
        .volume(args.volume)
        .cipher_keys(args.ciph_key1, args.ciph_key2);

    let mut any_failed = false;
    for src in &args.files {
        let dst = output_path(src, &args.save_dir);
        match decode_one(&decoder, src, &dst) {
            Ok(()) => println!("Decode: {} -> {}", src, dst.display()),
            Err(err) => {
                println!("Failed: {src} ({err})");
                any_failed = true;
            }
        }
    }

    if any_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
