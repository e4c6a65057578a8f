//! Compiles the tfplugin6 protocol definition into Rust code using tonic-build.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/tfplugin6.proto");

    // Prefer a protoc from the environment, fall back to the vendored binary.
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(&["proto/tfplugin6.proto"], &["proto"])?;

    Ok(())
}
