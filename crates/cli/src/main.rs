use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use clinlab_core::{
    constants, resolve_catalog_dir, CatalogCache, HttpTransport, PostalService, ResultEntry,
    ResultGenerator, Sex, StudyType,
};

#[derive(Parser)]
#[command(name = "clinlab")]
#[command(about = "Clinical laboratory record system CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the recognized study types
    Estudios,
    /// Generate a result panel for a study type
    Generar {
        /// Study type code (biometria_hematica, quimica_sanguinea, examen_orina)
        tipo: String,
        /// Patient sex for the reference ranges (M or F)
        #[arg(long, default_value = "M")]
        sexo: String,
    },
    /// Look up a Mexican postal code
    Cp {
        /// Five-digit postal code
        codigo: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Estudios) => {
            for study in StudyType::ALL {
                println!("{} - {}", study.code(), study.display_name());
            }
        }
        Some(Commands::Generar { tipo, sexo }) => {
            let catalog_override = std::env::var("CLINLAB_CATALOG_DIR").ok().map(PathBuf::from);
            let catalog_dir = resolve_catalog_dir(catalog_override)?;
            let generator = ResultGenerator::new(Arc::new(CatalogCache::new(catalog_dir)));

            let sex = Sex::from_code(Some(sexo.as_str()));
            println!("{}", clinlab_core::display_name(&tipo));
            println!(
                "Sexo: {}",
                match sex {
                    Sex::Male => "Masculino",
                    Sex::Female => "Femenino",
                }
            );

            match generator.generate(&tipo, sex) {
                Ok(resultados) => {
                    println!("Se generaron {} parámetros\n", resultados.len());
                    for (i, resultado) in resultados.iter().enumerate() {
                        let estado = if resultado.is_normal() {
                            "NORMAL"
                        } else {
                            "ANORMAL"
                        };
                        match resultado {
                            ResultEntry::Quantitative(r) => println!(
                                "{}. {}: {} {} (Rango: {}-{}) {}",
                                i + 1,
                                r.parameter,
                                r.value,
                                r.unit,
                                r.range_min,
                                r.range_max,
                                estado
                            ),
                            ResultEntry::Qualitative(r) => {
                                println!("{}. {}: {} {}", i + 1, r.parameter, r.value, estado)
                            }
                        }
                    }

                    let normales = resultados.iter().filter(|r| r.is_normal()).count();
                    println!(
                        "\nEstadísticas: {} normales, {} anormales",
                        normales,
                        resultados.len() - normales
                    );
                }
                Err(e) => eprintln!("Error generando resultados: {}", e),
            }
        }
        Some(Commands::Cp { codigo }) => {
            let base_url = std::env::var("COPOMEX_BASE_URL")
                .unwrap_or_else(|_| constants::DEFAULT_POSTAL_BASE_URL.into());
            let token = std::env::var("COPOMEX_TOKEN")
                .unwrap_or_else(|_| constants::DEFAULT_POSTAL_TOKEN.into());
            let service = PostalService::new(HttpTransport::new(&base_url, &token)?);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            match runtime.block_on(service.lookup(&codigo)) {
                Ok(info) => {
                    println!("Estado: {}", info.state);
                    println!("Municipio: {}", info.municipality);
                    println!("Colonias encontradas: {}", info.neighborhoods.len());
                    for colonia in &info.neighborhoods {
                        println!("  - {}", colonia);
                    }
                }
                Err(e) => eprintln!("Error consultando código postal: {}", e),
            }
        }
        None => {
            println!("Use 'clinlab --help' for commands");
        }
    }

    Ok(())
}
