/// Build script for GraphicEngine
///
/// The HLSL source is compiled at runtime via D3DCompile, so the build only
/// needs to be re-run when the shader changes.
fn main() {
    println!("cargo:rerun-if-changed=res/shaders/shader.hlsl");
}
