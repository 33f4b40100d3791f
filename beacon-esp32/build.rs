use embuild::{build::CfgArgs, espidf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    CfgArgs::output_propagated("ESP_IDF")?;
    espidf::sysenv::output();

    println!("cargo:rerun-if-changed=sdkconfig.defaults");
    Ok(())
}
