#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use isodetect::detection::{locate, locate_above_floor, TruePeakParams};
use isodetect::mzml::{read_sample_from, MzMLStreamer};

fuzz_target!(|data: &[u8]| {
    // Reading must either succeed or fail with an error, never panic
    let Ok(sample) = read_sample_from(MzMLStreamer::new(Cursor::new(data)), "fuzz") else {
        return;
    };

    let params = TruePeakParams::default();
    for spectrum in sample.spectra() {
        let Some(&first) = spectrum.mz().first() else {
            continue;
        };
        for target in [first, first + 0.1, 283.2637] {
            let _ = locate(spectrum.mz(), spectrum.intensity(), target, 0.3, &params);
            let _ = locate_above_floor(spectrum.mz(), spectrum.intensity(), target, 0.3, 1000.0);
        }
    }
});
