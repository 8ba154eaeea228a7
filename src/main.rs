use clap::Parser;
use geo_owl::utils::logger;
use geo_owl::{CliConfig, GeoOwlError, LaunchSettings, Launcher, SystemRunner, TomlConfig};

/// 失敗時只輸出一行錯誤，細節留給 --verbose
fn report_failure(e: &GeoOwlError) -> ! {
    tracing::error!("❌ {}", e.user_friendly_message());
    tracing::debug!(
        "{} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::debug!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

fn print_plan(settings: &LaunchSettings) {
    println!("📋 Launch plan:");
    println!("  Project: {}", settings.project_dir.display());
    if settings.env_exists() {
        println!("  Environment: {} (exists, reused)", settings.env_dir.display());
    } else {
        println!("  Environment: {} (will be created)", settings.env_dir.display());
        println!("    $ {}", settings.create_env_command().display());
    }
    if settings.install.should_install() {
        println!("  Dependencies: install from {}", settings.manifest.display());
        println!("    $ {}", settings.install_command().display());
    } else {
        println!(
            "  Dependencies: skipped (set {}=1 to install)",
            settings.install_flag
        );
    }
    println!("  Server:");
    println!("    $ {}", settings.launch_command().display());
}

#[tokio::main]
async fn main() {
    let args = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);
    tracing::debug!("CLI config: {:?}", args);

    let project_dir = match args.project_dir() {
        Ok(dir) => dir,
        Err(e) => report_failure(&GeoOwlError::IoError(e)),
    };

    // 載入配置並解析環境變數
    let settings = match TomlConfig::discover(&project_dir, args.config.as_deref())
        .and_then(|config| LaunchSettings::from_env(&project_dir, &config))
    {
        Ok(settings) => settings,
        Err(e) => report_failure(&e),
    };

    if args.dry_run {
        print_plan(&settings);
        return;
    }

    let launcher = Launcher::new(SystemRunner::new(), settings);
    match launcher.run().await {
        Ok(report) => {
            tracing::info!(
                "✅ Session ended (environment {:?}, dependencies installed: {}, uptime: {}s)",
                report.environment,
                report.dependencies_installed,
                (chrono::Local::now() - report.started_at).num_seconds()
            );
        }
        Err(e) => report_failure(&e),
    }
}
