use std::process::ExitCode;

fn main() -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("invoice-parser: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let code = match runtime.block_on(invoice_parser_lib::run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "invoice-parser failed");
            ExitCode::FAILURE
        }
    };

    // A pending stdin read sits on a blocking thread that cannot be cancelled;
    // waiting for it would keep the process alive after Ctrl-C.
    runtime.shutdown_background();
    code
}
