pub mod assembly;
pub mod bank;
pub mod bench;
pub mod branch;
pub mod config;
pub mod data;
pub mod error;
pub mod image;
pub mod instr;
pub mod label;
pub mod offset;
pub mod stream;
pub mod symbol;
pub mod util;

use config::MemoryMap;
use error::AsmResult;
use image::ImageSet;

/// State of the interactive front end: the map in use and the images of
/// the last benchmark assembled against it.
#[derive(Debug)]
pub struct AsmApp {
    pub map: MemoryMap,
    pub images: Option<ImageSet>,
    pub bench: Option<&'static str>,
}

impl AsmApp {
    pub fn new() -> AsmResult<AsmApp> {
        Ok(AsmApp {
            map: MemoryMap::builtin()?,
            images: None,
            bench: None,
        })
    }

    pub fn load_map(&mut self, text: &str) -> AsmResult<()> {
        self.map = MemoryMap::parse(text)?;
        // images built against the old map no longer mean anything
        self.images = None;
        self.bench = None;
        Ok(())
    }

    pub fn assemble(&mut self, name: &str) -> Result<&ImageSet, String> {
        let bench = bench::by_name(name).ok_or(format!("Unknown benchmark: {name}"))?;
        let images = (bench.assemble)(&self.map)?;
        self.bench = Some(bench.name);
        Ok(self.images.insert(images))
    }

    pub fn images(&self) -> Result<&ImageSet, String> {
        self.images
            .as_ref()
            .ok_or_else(|| "Nothing assembled yet, try `bench array_scalar`".to_string())
    }

    pub fn ready_to_view(&self) -> bool {
        self.images.is_some()
    }
}

#[test]
fn test_unknown_benchmark() {
    let mut app = AsmApp::new().unwrap();
    assert!(app.assemble("nope").is_err());
    assert!(!app.ready_to_view());
}

#[test]
fn test_new_map_drops_images() {
    let mut app = AsmApp::new().unwrap();
    app.assemble("array_scalar").unwrap();
    assert!(app.ready_to_view());
    app.load_map("A depth=4").unwrap();
    assert!(app.images().is_err());
}
