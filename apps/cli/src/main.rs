use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    AdminClient, CachedFeedClient, FeedClient, HttpDataSource, ResourceState, ResponseCache,
    SlideshowController,
};
use shared::{
    domain::{CarouselImage, CarouselImageId, Project, ProjectId},
    protocol::{CarouselImageDraft, ProjectDraft},
};

#[derive(Parser, Debug)]
#[command(name = "folio", about = "Terminal front end for the folio portfolio server")]
struct Args {
    #[arg(long)]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the landing-page feed once and print it.
    Show {
        /// Read through the TTL response cache.
        #[arg(long)]
        cached: bool,
    },
    /// Cycle through the carousel in the terminal.
    Slideshow {
        #[arg(long, default_value_t = 5000)]
        interval_ms: u64,
        /// How many intervals to display before exiting.
        #[arg(long, default_value_t = 10)]
        steps: u32,
    },
    /// Manage portfolio content.
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    #[command(subcommand)]
    Project(ProjectCommand),
    #[command(subcommand)]
    Carousel(CarouselCommand),
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        cover: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    Update {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        cover: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    Remove {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum CarouselCommand {
    List,
    Add {
        #[arg(long)]
        path: String,
        #[arg(long)]
        desc: Option<String>,
    },
    Update {
        #[arg(long)]
        id: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        desc: Option<String>,
    },
    Remove {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    match args.command {
        Command::Show { cached } => show(&args.server_url, cached).await,
        Command::Slideshow { interval_ms, steps } => {
            slideshow(&args.server_url, interval_ms, steps).await
        }
        Command::Admin(command) => admin(&args.server_url, command).await,
    }
}

async fn show(server_url: &str, cached: bool) -> Result<()> {
    let source = Arc::new(HttpDataSource::new(server_url)?);
    let (projects, carousel) = if cached {
        let client = CachedFeedClient::new(source, Arc::new(ResponseCache::new()));
        client.load().await;
        (client.projects().await, client.carousel().await)
    } else {
        let client = FeedClient::new(source);
        client.refetch().await;
        (client.projects().await, client.carousel().await)
    };

    print_projects(&projects);
    print_carousel(&carousel);

    if projects.error.is_some() && carousel.error.is_some() {
        bail!("both feed resources failed to load");
    }
    Ok(())
}

fn print_projects(state: &ResourceState<Project>) {
    match &state.error {
        Some(error) => println!("projects unavailable: {error}"),
        None => {
            println!("projects ({}):", state.data.len());
            for project in &state.data {
                let url = project.url.as_deref().unwrap_or("-");
                println!("  {}  {}  {}", project.id, project.name, url);
            }
        }
    }
}

fn print_carousel(state: &ResourceState<CarouselImage>) {
    match &state.error {
        Some(error) => println!("carousel unavailable: {error}"),
        None => {
            println!("carousel ({}):", state.data.len());
            for image in &state.data {
                let desc = image.desc.as_deref().unwrap_or("-");
                println!("  {}  {}", image.path, desc);
            }
        }
    }
}

async fn slideshow(server_url: &str, interval_ms: u64, steps: u32) -> Result<()> {
    let source = Arc::new(HttpDataSource::new(server_url)?);
    let client = FeedClient::new(source);
    client.refetch().await;

    let carousel = client.carousel().await;
    if let Some(error) = carousel.error {
        bail!("carousel unavailable: {error}");
    }
    if carousel.data.is_empty() {
        println!("carousel is empty");
        return Ok(());
    }

    let interval = Duration::from_millis(interval_ms);
    let slides = SlideshowController::new(carousel.data.len(), interval);
    let mut last = usize::MAX;
    for _ in 0..steps {
        let current = slides.current_index().await;
        if current != last {
            let image = &carousel.data[current];
            let desc = image.desc.as_deref().unwrap_or("");
            println!(
                "[{}/{}] {} {}",
                current + 1,
                carousel.data.len(),
                image.path,
                desc
            );
            last = current;
        }
        tokio::time::sleep(interval).await;
    }
    Ok(())
}

async fn admin(server_url: &str, command: AdminCommand) -> Result<()> {
    let admin = AdminClient::new(server_url);
    match command {
        AdminCommand::Project(command) => match command {
            ProjectCommand::List => {
                for record in admin.list_projects().await? {
                    println!("{}  {}", record.id, record.name);
                }
            }
            ProjectCommand::Add {
                name,
                description,
                cover,
                url,
            } => {
                let ack = admin
                    .create_project(&ProjectDraft {
                        name,
                        description,
                        cover,
                        url,
                    })
                    .await?;
                println!("created: success={}", ack.success);
            }
            ProjectCommand::Update {
                id,
                name,
                description,
                cover,
                url,
            } => {
                let ack = admin
                    .update_project(
                        &ProjectId(id),
                        &ProjectDraft {
                            name,
                            description,
                            cover,
                            url,
                        },
                    )
                    .await?;
                println!("updated: success={}", ack.success);
            }
            ProjectCommand::Remove { id } => {
                let ack = admin.delete_project(&ProjectId(id)).await?;
                println!("removed: success={}", ack.success);
            }
        },
        AdminCommand::Carousel(command) => match command {
            CarouselCommand::List => {
                for record in admin.list_carousel_images().await? {
                    let desc = record.desc.as_deref().unwrap_or("-");
                    println!("{}  {}  {}", record.id, record.path, desc);
                }
            }
            CarouselCommand::Add { path, desc } => {
                let ack = admin
                    .create_carousel_image(&CarouselImageDraft { path, desc })
                    .await?;
                println!("created: success={}", ack.success);
            }
            CarouselCommand::Update { id, path, desc } => {
                let ack = admin
                    .update_carousel_image(&CarouselImageId(id), &CarouselImageDraft { path, desc })
                    .await?;
                println!("updated: success={}", ack.success);
            }
            CarouselCommand::Remove { id } => {
                let ack = admin.delete_carousel_image(&CarouselImageId(id)).await?;
                println!("removed: success={}", ack.success);
            }
        },
    }
    Ok(())
}
