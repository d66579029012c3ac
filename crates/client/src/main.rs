use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use shopfront_client::forms::{FormAction, FormController};
use shopfront_client::{App, ClientConfig, Screen};
use shopfront_observability::LogFormat;
use shopfront_products::ProductId;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(about = "Shopfront catalog client", long_about = None)]
struct Cli {
    /// Catalog API base URL (overrides SHOPFRONT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and remember the session
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the remembered session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Work with the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Resolve a client route for the current session
    Open { path: String },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List,
    /// Create a product from an image file
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        price: String,
        #[arg(long)]
        stock: String,
        /// Image file to embed
        #[arg(long)]
        image: Option<String>,
    },
    /// Edit a product; omitted fields keep their current value
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        stock: Option<String>,
        /// New image file to embed
        #[arg(long)]
        image: Option<String>,
        /// New hosted image URL
        #[arg(long)]
        image_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url)?;
    }
    if cli.json_logs {
        config.log_format = LogFormat::Json;
    }
    shopfront_observability::init_with(config.log_format);

    let app = App::from_config(config)?;
    app.start().await;

    match cli.command {
        Commands::Register { email, password } => {
            let mut form = app.register_form();
            form.set_field("email", email)?;
            form.set_field("password", password)?;
            submit(&mut form).await?;
        }
        Commands::Login { email, password } => {
            let mut form = app.login_form();
            form.set_field("email", email)?;
            form.set_field("password", password)?;
            submit(&mut form).await?;
        }
        Commands::Logout => {
            app.logout().await;
            println!("Logged out.");
        }
        Commands::Whoami => match app.current_user() {
            Some(user) => println!("{}", user.email),
            None => println!("Not logged in."),
        },
        Commands::Products { action } => products(&app, action).await?,
        Commands::Open { path } => match app.open(&path) {
            Screen::Render(view) => println!("{view:?}"),
            Screen::Redirect(to) => println!("redirected to {to}"),
            Screen::Blank => println!("(waiting for session)"),
            Screen::NotFound => bail!("no route for {path}"),
        },
    }

    Ok(())
}

async fn products(app: &App, action: ProductsAction) -> Result<()> {
    match action {
        ProductsAction::List => {
            let records = app.list_products().await?;
            if records.is_empty() {
                println!("No products.");
            }
            for record in records {
                let image = record.image.as_ref().map(|i| i.summary()).unwrap_or_default();
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    record.id, record.name, record.price, record.stock, image
                );
            }
        }
        ProductsAction::Create {
            name,
            description,
            price,
            stock,
            image,
        } => {
            let mut form = app.create_product_form();
            form.set_field("name", name)?;
            form.set_field("description", description)?;
            form.set_field("price", price)?;
            form.set_field("stock", stock)?;
            form.set_field("image_file", image.unwrap_or_default())?;
            submit(&mut form).await?;
        }
        ProductsAction::Edit {
            id,
            name,
            description,
            price,
            stock,
            image,
            image_url,
        } => {
            let mut form = app.edit_product_form(ProductId::new(id)).await?;
            let changes = [
                ("name", name),
                ("description", description),
                ("price", price),
                ("stock", stock),
                ("image_file", image),
                ("image_url", image_url),
            ];
            for (field, value) in changes {
                if let Some(value) = value {
                    form.set_field(field, value)?;
                }
            }
            submit(&mut form).await?;
        }
    }
    Ok(())
}

/// Submit and print the outcome the way the form shows it.
async fn submit<A: FormAction>(form: &mut FormController<A>) -> Result<()> {
    let outcome = form.submit().await;
    let state = form.state();

    if let Err(err) = outcome {
        tracing::debug!(error = %err, "submission failed");
        bail!("{}", state.error_message().unwrap_or("Error"));
    }

    if let Some(message) = state.result_message() {
        println!("{message}");
    }
    if let Some(redirect) = form.pending_redirect() {
        println!("next: {}", redirect.path());
    }
    Ok(())
}
