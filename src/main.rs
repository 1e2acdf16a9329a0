//! tftpd - main entrypoint
// (c) 2026 tftpd contributors

fn main() -> std::process::ExitCode {
    tftpd::main(std::env::args_os())
}
