use bankasm::{
    bench::BENCHMARKS,
    image::mem_dump,
    util::{writeout, writeout_bank, writeout_branches},
    AsmApp,
};
use rustyline::{error::ReadlineError, Editor, Result as RustyResult};

use app::viewmode::start_viewmode;

mod app;

fn main() -> RustyResult<()> {
    env_logger::init();

    let mut rl = Editor::<()>::new()?;
    let mut asm = match AsmApp::new() {
        Ok(asm) => asm,
        Err(err) => {
            println!("{err}");
            return Ok(());
        }
    };
    loop {
        match rl.readline("> ") {
            Ok(str) => {
                match str.trim() {
                    "exit" => break,
                    "" => (),
                    "help" => print_help(),
                    "map" => print!("{}", asm.map),
                    map_cmd if map_cmd.starts_with("map ") => {
                        succeed(load_map(map_cmd[4..].trim(), &mut asm))
                    }
                    "bench" => println!(
                        "{}",
                        writeout(BENCHMARKS.iter().map(|b| format!("{}\t{}", b.name, b.description)))
                    ),
                    bench_cmd if bench_cmd.starts_with("bench ") => {
                        succeed(assemble(bench_cmd[6..].trim(), &mut asm))
                    }
                    "banks" => succeed(print_banks(&asm)),
                    dump_cmd if dump_cmd.starts_with("dump ") => {
                        succeed(print_dump(dump_cmd[5..].trim(), &asm))
                    }
                    "branches" => succeed(
                        asm.images()
                            .map(|images| print!("{}", writeout_branches(images))),
                    ),
                    write_cmd if write_cmd.starts_with("write ") => {
                        succeed(write_images(write_cmd[6..].trim(), &asm))
                    }
                    "view" => {
                        if asm.ready_to_view() {
                            start_viewmode(&asm).map_err(|_| ReadlineError::Interrupted)?
                        } else {
                            succeed(asm.images().map(|_| ()))
                        }
                    }
                    other => println!("Unknown command: {other}, try `help`"),
                }
                rl.add_history_entry(str);
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
    Ok(())
}

fn print_help() {
    const TEXT: &str = r#"map               show the memory map
map <path>        load a memory map file
bench             list benchmarks
bench <name>      assemble a benchmark against the current map
banks             list assembled banks
dump <bank> [-a]  show the written words of a bank, -a for every cell
branches          show the branch table
write <dir>       write one .mem file per bank
view              browse the images full screen
exit"#;
    println!("{TEXT}");
}

fn load_map(path: &str, asm: &mut AsmApp) -> Result<(), String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    asm.load_map(&text)?;
    println!("{} banks", asm.map.len());
    Ok(())
}

fn assemble(name: &str, asm: &mut AsmApp) -> Result<(), String> {
    let images = asm.assemble(name)?;
    let written = images.iter().filter(|b| !b.is_empty()).count();
    println!("{name}: {} banks, {written} with content", images.len());
    Ok(())
}

fn print_banks(asm: &AsmApp) -> Result<(), String> {
    let images = asm.images()?;
    println!(
        "{}",
        writeout(
            images
                .iter()
                .map(|b| format!("{}\t{} words\t{} labels", b.name(), b.len(), b.labels().len()))
        )
    );
    Ok(())
}

fn print_dump(name: &str, asm: &AsmApp) -> Result<(), String> {
    let (bank, full) = match name.strip_suffix(" -a") {
        Some(name) => (name.trim(), true),
        None => (name, false),
    };
    let bank = asm
        .images()?
        .get(bank)
        .ok_or(format!("No bank named {bank}"))?;
    if full {
        print!("{}", mem_dump(bank));
    } else {
        print!("{}", writeout_bank(bank));
    }
    Ok(())
}

fn write_images(dir: &str, asm: &AsmApp) -> Result<(), String> {
    let count = asm
        .images()?
        .write_to(std::path::Path::new(dir))
        .map_err(|e| e.to_string())?;
    println!("wrote {count} files to {dir}");
    Ok(())
}

fn succeed<T: ToString>(result: Result<(), T>) {
    match result {
        Ok(()) => {}
        Err(e) => println!("{}", e.to_string()),
    }
}
