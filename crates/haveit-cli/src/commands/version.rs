use haveit_core::version::version_string;
use haveit_core::VERSION;
use miette::Result;

pub fn run(json: bool) -> Result<()> {
    if json {
        println!(r#"{{"ok":true,"version":"{VERSION}"}}"#);
    } else {
        println!("{}", version_string());
    }
    Ok(())
}
