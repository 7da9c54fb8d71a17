use clap::Parser;

use ttb_merge::{
    check::ValidationReport, core::ExitCode, error::ValidationError, models::CheckArgs,
};

fn main() -> std::process::ExitCode {
    let args = CheckArgs::parse();

    match ValidationReport::load(&args.input_file) {
        Ok(report) => {
            for line in report.summary() {
                println!("{}", line);
            }
            report.exit_code().into()
        }
        Err(e) => {
            match e.downcast_ref::<ValidationError>() {
                Some(ValidationError::Empty) => println!("{}", ValidationError::Empty),
                _ => eprintln!("Error: {:#}", e),
            }
            ExitCode::GeneralError.into()
        }
    }
}
