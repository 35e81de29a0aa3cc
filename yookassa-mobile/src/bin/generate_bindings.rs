//! Generates Swift, Kotlin or Python bindings from the compiled library
//! using uniffi_bindgen's library mode.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use uniffi_bindgen::bindings::{KotlinBindingGenerator, PythonBindingGenerator, SwiftBindingGenerator};
use uniffi_bindgen::library_mode::generate_bindings;
use uniffi_bindgen::BindingGenerator;

#[derive(Parser)]
#[command(name = "generate-bindings")]
#[command(about = "Generate UniFFI bindings for yookassa-mobile")]
struct Cli {
    /// Path to the compiled library (.dylib, .so, or .a file)
    #[arg(long, default_value = "../target/release/libyookassa_mobile.dylib")]
    library: Utf8PathBuf,

    /// Output language
    #[arg(short = 'l', long = "language", default_value = "swift")]
    language: Language,

    /// Output directory
    #[arg(short = 'o', long = "out-dir")]
    out_dir: Option<Utf8PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Language {
    Swift,
    Kotlin,
    Python,
}

impl Language {
    fn name(self) -> &'static str {
        match self {
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Python => "python",
        }
    }
}

fn generate(
    library: &Utf8PathBuf,
    generator: &impl BindingGenerator,
    out_dir: &Utf8PathBuf,
) -> anyhow::Result<()> {
    generate_bindings(
        library,
        None,
        generator,
        &uniffi_bindgen::EmptyCrateConfigSupplier,
        None,
        out_dir,
        false,
    )?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let out_dir = cli
        .out_dir
        .unwrap_or_else(|| Utf8PathBuf::from(format!("./{}/generated", cli.language.name())));
    std::fs::create_dir_all(&out_dir)?;

    if !cli.library.exists() {
        anyhow::bail!("Library not found: {}", cli.library);
    }

    println!("Generating {} bindings from {} into {}", cli.language.name(), cli.library, out_dir);

    match cli.language {
        Language::Swift => generate(&cli.library, &SwiftBindingGenerator, &out_dir)?,
        Language::Kotlin => generate(&cli.library, &KotlinBindingGenerator, &out_dir)?,
        Language::Python => generate(&cli.library, &PythonBindingGenerator, &out_dir)?,
    }

    println!("Bindings generated");
    Ok(())
}
