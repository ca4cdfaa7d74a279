//! Print a summary of the extensions in a NIFITS file.

use std::env;
use std::process::ExitCode;

use nifits::{ExtensionKind, KindStatus, Nifits, Partition};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: nifitsinfo <file>");
        return ExitCode::FAILURE;
    }

    let (file, report) = match Nifits::open(&args[1]) {
        Ok(x) => x,
        Err(e) => {
            eprintln!("nifitsinfo: {}: {e}", args[1]);
            return ExitCode::FAILURE;
        }
    };

    println!("{}", args[1]);
    for kind in ExtensionKind::ALL {
        let partition = match kind.partition() {
            Partition::Static => "static",
            Partition::Dynamic => "dynamic",
        };
        let status = match report.status(kind) {
            Some(KindStatus::Present) => describe(&file, kind),
            Some(KindStatus::Missing) => String::from("absent"),
            Some(KindStatus::Failed(e)) => format!("failed: {e}"),
            None => String::from("absent"),
        };
        println!("  {:<14} {:<8} {status}", kind.extname(), partition);
    }

    ExitCode::SUCCESS
}

fn describe(file: &Nifits, kind: ExtensionKind) -> String {
    match kind {
        ExtensionKind::ArrayGeometry => match &file.oi_array {
            Some(a) => format!("{} stations", a.n_stations()),
            None => String::from("present"),
        },
        ExtensionKind::WavelengthGrid => match &file.oi_wavelength {
            Some(w) => format!("{} channels", w.n_channels()),
            None => String::from("present"),
        },
        ExtensionKind::TransferMatrix => match &file.ni_catm {
            Some(c) => format!("shape {:?}", c.matrix().shape()),
            None => String::from("present"),
        },
        ExtensionKind::KernelMatrix => match &file.ni_kmat {
            Some(k) => format!("shape {:?}", k.matrix().shape()),
            None => String::from("present"),
        },
        ExtensionKind::OutputCovariance => match &file.ni_kcov {
            Some(k) => format!("shape {:?}", k.kcov().shape()),
            None => String::from("present"),
        },
        ExtensionKind::ModulationSeries => match &file.ni_mod {
            Some(m) => format!("{} frames", m.n_series()),
            None => String::from("present"),
        },
        ExtensionKind::RawOutput | ExtensionKind::KernelOutput => {
            let table = match kind {
                ExtensionKind::RawOutput => file.ni_iout.as_ref().map(|x| &x.ext.table),
                _ => file.ni_kiout.as_ref().map(|x| &x.ext.table),
            };
            match table {
                Some(t) => format!("{} rows", t.nrows()),
                None => String::from("present"),
            }
        }
        ExtensionKind::FieldOfView => match &file.ni_fov {
            Some(f) => format!("mode {}", f.mode().unwrap_or("?")),
            None => String::from("present"),
        },
        ExtensionKind::TargetList => match &file.oi_target {
            Some(t) => format!("{} targets", t.n_targets()),
            None => String::from("present"),
        },
    }
}
