//! Build script that compiles the Protocol Buffer definitions with tonic-build.
//!
//! The generated code lands in `$OUT_DIR` and is pulled into the crate via
//! `tonic::include_proto!` in the `grpc` module.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/library.proto");
    println!("cargo:rerun-if-changed=proto");

    tonic_build::configure().build_server(true).build_client(true).compile_protos(
        &["proto/library.proto"],
        &["proto"],
    )?;

    Ok(())
}
