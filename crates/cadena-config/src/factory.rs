//! Factory chains bundled with the library.
//!
//! Always available without files on disk; the CLI falls back to them when
//! a chain name is not found in the chain directories.

use crate::ChainDocument;

/// TOML content for factory chains, embedded at compile time.
static FACTORY_CHAINS_TOML: &[(&str, &str)] = &[
    ("stereo-strip", STEREO_STRIP),
    ("mono-to-stereo", MONO_TO_STEREO),
    ("test-tone", TEST_TONE),
    ("tremolo-tone", TREMOLO_TONE),
];

/// Stereo channel strip with a metered gain stage.
const STEREO_STRIP: &str = r#"
name = "stereo-strip"
description = "Stereo gain stage with a peak meter and level indicator"
sample_rate = 48000
nframes = 256

[[modules]]
kind = "capture"
[modules.settings]
channels = "2"

[[modules]]
kind = "gain"
[modules.controls]
gain = 0.0

[[modules]]
kind = "meter"

[[modules]]
kind = "playback"

[[modules]]
kind = "indicator"

[[links]]
from = 2
output = "level"
to = 4
input = "level"
"#;

/// Mono input panned to stereo.
const MONO_TO_STEREO: &str = r#"
name = "mono-to-stereo"
description = "Mono capture panned across a stereo output"
sample_rate = 48000
nframes = 256

[[modules]]
kind = "capture"
[modules.settings]
channels = "1"

[[modules]]
kind = "pan"
[modules.controls]
pan = 0.0

[[modules]]
kind = "playback"
"#;

/// Sine tone replacing the input.
const TEST_TONE: &str = r#"
name = "test-tone"
description = "440 Hz sine at -18 dBFS on two channels"
sample_rate = 48000
nframes = 256

[[modules]]
kind = "capture"
[modules.settings]
channels = "2"

[[modules]]
kind = "tone"
[modules.controls]
frequency = 440.0
level = -18.0
[modules.settings]
channels = "2"

[[modules]]
kind = "playback"
"#;

/// Tone with its gain swept by a controller.
const TREMOLO_TONE: &str = r#"
name = "tremolo-tone"
description = "220 Hz sine whose gain is swept at 4 Hz by a controller"
sample_rate = 48000
nframes = 256

[[modules]]
kind = "capture"
[modules.settings]
channels = "1"

[[modules]]
kind = "tone"
[modules.controls]
frequency = 220.0
level = -12.0

[[modules]]
kind = "gain"

[[modules]]
kind = "playback"

[[modules]]
kind = "controller"
[modules.controls]
value = -12.0
[modules.settings]
min = "-24"
max = "0"
rate = "4"
depth = "1"

[[links]]
from = 4
output = "out"
to = 2
input = "gain"
"#;

/// All factory chains.
pub fn factory_chains() -> Vec<ChainDocument> {
    FACTORY_CHAINS_TOML
        .iter()
        .filter_map(|(_, toml)| ChainDocument::from_toml(toml).ok())
        .collect()
}

/// Factory chain by name, case-insensitive.
pub fn get_factory_chain(name: &str) -> Option<ChainDocument> {
    FACTORY_CHAINS_TOML
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .and_then(|(_, toml)| ChainDocument::from_toml(toml).ok())
}

/// Names of all factory chains.
pub fn factory_chain_names() -> Vec<&'static str> {
    FACTORY_CHAINS_TOML.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cadena_core::DummyBackend;
    use cadena_modules::ModuleRegistry;

    #[test]
    fn test_all_factory_chains_parse() {
        assert_eq!(factory_chains().len(), factory_chain_names().len());
    }

    #[test]
    fn test_all_factory_chains_build() {
        let registry = ModuleRegistry::new();
        for doc in factory_chains() {
            let backend = Arc::new(DummyBackend::new(doc.sample_rate, doc.nframes));
            let chain = doc.build(&registry, backend);
            assert!(chain.is_ok(), "factory chain '{}' failed: {:?}", doc.name, chain.err());
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(get_factory_chain("Test-Tone").is_some());
        assert!(get_factory_chain("nope").is_none());
    }

    #[test]
    fn test_tremolo_runs_controller_first() {
        let doc = get_factory_chain("tremolo-tone").unwrap();
        let chain = doc
            .build(&ModuleRegistry::new(), Arc::new(DummyBackend::new(48000, 256)))
            .unwrap();
        let queue = chain.process_queue();
        let gain = chain.module_at(2).unwrap();
        let ctl = chain.satellites().next().unwrap();
        let at = |id| queue.iter().position(|&m| m == id).unwrap();
        assert!(at(ctl) < at(gain));
    }
}
