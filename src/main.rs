use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use vps_panel::app::App;
use vps_panel::cli::{Cli, Commands, ComposeCommands};
use vps_panel::core::{
    ActionResult, Controller, DatabasePanel, DescriptorState, DiskUsage, DockerManager, Snapshot,
};
use vps_panel::utils::{
    bytes_to_gb, bytes_to_mb, format_bytes, format_datetime, format_timestamp, join_or, logging,
    truncate_string, Settings, UNTAGGED,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;

    match cli.command {
        None => {
            // No command - run interactive TUI
            let log_path = logging::init_file("info")?;
            tracing::info!(log = %log_path.display(), "starting dashboard");
            let controller = build_controller(&settings)?;
            let mut app = App::new(controller);
            app.run().await?;
        }
        #[cfg(feature = "server")]
        Some(Commands::Serve { port, host, cors }) => {
            logging::init_stderr("info");
            let controller = build_controller(&settings)?;
            vps_panel::server::run(host, port, cors, controller).await?;
        }
        Some(command) => {
            logging::init_stderr("warn");
            run_command(command, &settings).await?;
        }
    }

    Ok(())
}

/// The Docker handle is created once here and shared by every surface
fn build_controller(settings: &Settings) -> Result<Arc<Controller>> {
    let docker = DockerManager::connect()
        .context("Failed to connect to Docker daemon. Is Docker running?")?;
    Ok(Arc::new(Controller::from_settings(settings, Arc::new(docker))))
}

async fn run_command(command: Commands, settings: &Settings) -> Result<()> {
    let controller = build_controller(settings)?;

    match command {
        Commands::Status => handle_status(&controller).await,
        Commands::Disk => handle_disk(&controller).await,
        Commands::Ports => handle_ports(&controller).await,
        Commands::Databases => handle_databases(&controller).await,
        Commands::Images { dangling } => handle_images(&controller, dangling).await,
        Commands::Stop { names } => print_action(controller.stop_selected(&names).await),
        Commands::Rm { force, names } => {
            print_action(controller.remove_containers(&names, force).await)
        }
        Commands::Rmi { id } => print_action(controller.remove_image(&id).await),
        Commands::Compose { command } => handle_compose(&controller, command).await,
        Commands::Docs => {
            let text = controller.docs().context("Failed to read documentation")?;
            print!("{}", text);
            Ok(())
        }
        #[cfg(feature = "server")]
        Commands::Serve { .. } => Ok(()),
    }
}

async fn inspect(controller: &Controller) -> Result<Snapshot> {
    controller.inspect().await.context("Inspection failed")
}

fn print_disk(disk: &DiskUsage) {
    let percent = format!("{:.1}%", disk.percent);
    let percent = if disk.percent >= 90.0 {
        percent.red().bold()
    } else if disk.percent >= 75.0 {
        percent.yellow()
    } else {
        percent.green()
    };

    println!("{}", "Disk".bold());
    println!(
        "  {}  total {:.2} GB  used {:.2} GB  free {:.2} GB  {}",
        disk.mount_point,
        bytes_to_gb(disk.total_bytes),
        bytes_to_gb(disk.used_bytes),
        bytes_to_gb(disk.available_bytes),
        percent
    );
}

async fn handle_status(controller: &Controller) -> Result<()> {
    let snapshot = inspect(controller).await?;

    print_disk(&snapshot.disk);
    println!();
    println!("{}", "Containers".bold());
    println!(
        "{:<24} {:<28} {:<22} {:>10}  {}",
        "Name", "Image", "Status", "Memory", "Ports"
    );
    println!("{}", "-".repeat(100));

    for container in &snapshot.containers {
        let tag = snapshot
            .container_tags(container)
            .into_iter()
            .next()
            .unwrap_or_else(|| UNTAGGED.to_string());
        let ports: Vec<String> = container
            .ports
            .iter()
            .map(|p| format!("{}->{}", p.host_port_label(), p.container_port))
            .collect();
        let status = format!("{:<22}", truncate_string(&container.status, 22)).color(container.state.color());

        println!(
            "{:<24} {:<28} {} {:>10}  {}",
            truncate_string(&container.name, 24),
            truncate_string(&tag, 28),
            status,
            format!("{:.2} MB", bytes_to_mb(container.memory_usage)),
            join_or(&ports, "-")
        );
    }

    if let Some(warning) = snapshot.databases.warning() {
        println!();
        println!("{}", warning.yellow());
    }

    Ok(())
}

async fn handle_disk(controller: &Controller) -> Result<()> {
    let disk = controller.disk_usage().await.context("Failed to read disk usage")?;
    print_disk(&disk);
    Ok(())
}

async fn handle_ports(controller: &Controller) -> Result<()> {
    let snapshot = inspect(controller).await?;

    println!("{}", "Host LISTEN sockets".bold());
    println!("{:<7} {:<8} {:<20} {}", "Port", "PID", "Process", "Command");
    println!("{}", "-".repeat(90));
    for socket in snapshot.listening() {
        println!(
            "{:<7} {:<8} {:<20} {}",
            socket.port,
            socket.pid,
            truncate_string(&socket.process_name, 20),
            truncate_string(&socket.command_line, 60)
        );
    }
    let omitted = snapshot.omitted_sockets();
    if omitted > 0 {
        println!("{}", format!("{} socket(s) without a resolvable owner", omitted).dimmed());
    }

    println!();
    println!("{}", "Docker exposed ports".bold());
    println!("{:<24} {:<10} {:<14} {:<22} {}", "Container", "Host", "Container", "Status", "Listening");
    println!("{}", "-".repeat(90));
    for row in snapshot.port_rows() {
        let listening = if row.host_listening { "yes".green() } else { "no".red() };
        println!(
            "{:<24} {:<10} {:<14} {:<22} {}",
            truncate_string(&row.binding.container, 24),
            row.binding.host_port_label(),
            row.binding.container_port,
            truncate_string(&row.binding.status, 22),
            listening
        );
    }

    Ok(())
}

async fn handle_databases(controller: &Controller) -> Result<()> {
    match controller.database_panel().await {
        DatabasePanel::Databases(names) => {
            println!("{}", "PostgreSQL databases".bold());
            for name in names {
                println!("  {}", name);
            }
        }
        DatabasePanel::Warning(message) => println!("{}", message.yellow()),
    }
    Ok(())
}

async fn handle_images(controller: &Controller, dangling_only: bool) -> Result<()> {
    let snapshot = inspect(controller).await?;

    if !dangling_only {
        println!("{}", "Uptime".bold());
        println!("{:<24} {:<20} {}", "Container", "Created", "Uptime");
        for row in snapshot.uptime_rows() {
            let created = row
                .created
                .as_ref()
                .map(format_datetime)
                .unwrap_or_else(|| "-".to_string());
            println!("{:<24} {:<20} {}", truncate_string(&row.container, 24), created, row.uptime);
        }

        println!();
        println!("{}", "Images".bold());
        println!("{:<14} {:<40} {:>10}  {}", "ID", "Tags", "Size", "Created");
        for image in &snapshot.images {
            println!(
                "{:<14} {:<40} {:>10}  {}",
                image.short_id,
                truncate_string(&join_or(&image.tags, UNTAGGED), 40),
                format_bytes(image.size),
                format_timestamp(image.created)
            );
        }

        println!();
        println!("{}", "Images in use".bold());
        for tag in snapshot.images_in_use() {
            println!("  {}", tag);
        }
        println!();
    }

    println!("{}", "Dangling images".bold());
    if snapshot.dangling.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for image in &snapshot.dangling {
        println!("  {:<14} {:>10}  {}", image.short_id, format_bytes(image.size), format_timestamp(image.created));
    }

    Ok(())
}

async fn handle_compose(controller: &Controller, command: ComposeCommands) -> Result<()> {
    match command {
        ComposeCommands::List => {
            for app in controller.compose().list_apps()? {
                println!("{}", app);
            }
            Ok(())
        }
        ComposeCommands::Show { app } => {
            match controller.read_descriptor(&app)? {
                DescriptorState::Found { content, .. } => print!("{}", content),
                DescriptorState::NotFound { path } => {
                    println!("{}", format!("No descriptor at {}", path.display()).yellow());
                }
            }
            Ok(())
        }
        ComposeCommands::Apply { app, file } => {
            let content = read_input(file)?;
            print_action(controller.save_descriptor(&app, &content).await)
        }
        ComposeCommands::Create { app, file } => {
            let content = read_input(file)?;
            print_action(controller.create_app(&app, &content).await)
        }
    }
}

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read descriptor from stdin")?;
            Ok(content)
        }
    }
}

fn print_action(result: ActionResult) -> Result<()> {
    let report = &result.report;

    for target in &report.succeeded {
        println!("{} {} {}", "✓".green(), report.action, target);
    }
    for failure in &report.failed {
        println!("{} {} {}: {}", "✗".red(), report.action, failure.target, failure.error);
    }
    if let Some(apply) = &report.apply {
        if !apply.stderr.trim().is_empty() {
            eprintln!("{}", apply.stderr.trim_end().dimmed());
        }
    }
    if let Some(error) = &result.refresh_error {
        println!("{}", format!("Refresh failed: {}", error).yellow());
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(anyhow!(report.summary()))
    }
}
