use anyhow::{anyhow, Context, Result};
use jack2vm::compile_class;
use std::env::args;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

fn main() -> Result<()> {
    let args = args().collect::<Vec<_>>();
    match args.len() {
        2 => {
            let path = Path::new(&args[1]);
            if path.is_dir() {
                compile_dir(path)
            } else {
                compile_file(path, &path.with_extension("vm"))
            }
        }
        3 => compile_file(Path::new(&args[1]), Path::new(&args[2])),
        _ => {
            println!("USAGE:\n  {} <src.jack | dir> [dst.vm]", args[0]);
            Err(anyhow!("invalid arguments"))
        }
    }
}

fn compile_dir(dir: &Path) -> Result<()> {
    let mut compiled = 0;
    for entry in fs::read_dir(dir)? {
        let src = entry?.path();
        if src.extension() == Some(OsStr::new("jack")) {
            compile_file(&src, &src.with_extension("vm"))?;
            compiled += 1;
        }
    }
    if compiled == 0 {
        return Err(anyhow!("no .jack files in {}", dir.display()));
    }
    Ok(())
}

fn compile_file(src: &Path, dst: &Path) -> Result<()> {
    let reader = BufReader::new(File::open(src)?);
    // compile into memory first so a failed unit leaves no partial output
    let mut buffer = Vec::new();
    compile_class(reader, &mut buffer).with_context(|| format!("while compiling {}", src.display()))?;
    fs::write(dst, buffer)?;
    Ok(())
}
