use chrono::{Days, Local};
use clap::{Parser, Subcommand};
use tracing::{error, info, Instrument};

use catering_storefront::app_system::{setup_tracing, Storefront};
use catering_storefront::catalog::{CatalogFilter, CategoryOption};
use catering_storefront::config::StorefrontConfig;
use catering_storefront::domain::{Category, OrderStatus, Product, Role};
use catering_storefront::feedback::{drain, UiEvent};
use catering_storefront::format::format_price;

#[derive(Parser)]
#[command(name = "storefront", version, about = "Catering storefront workflows")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs a scripted customer and admin session on the in-memory backend.
    Demo,
    /// Lists the catalog from the document database.
    Catalog {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        vegetarian: bool,
        #[arg(long)]
        combo: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Rewrites broken product and order item image references.
    RepairImages {
        /// Report what would change without writing.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    let cli = Cli::parse();
    let config = StorefrontConfig::load().map_err(|e| e.to_string())?;

    let result = match cli.command {
        Command::Demo => demo(&config).await,
        Command::Catalog { category, vegetarian, combo, limit } => {
            let category = match category {
                Some(name) => CategoryOption::Only(Category::parse(&name)),
                None => CategoryOption::All,
            };
            list_catalog(&config, CatalogFilter { category, vegetarian, combo }, limit).await
        }
        Command::RepairImages { dry_run } => repair_images(&config, dry_run).await,
    };
    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }
    result
}

async fn list_catalog(config: &StorefrontConfig, filter: CatalogFilter, limit: Option<usize>) -> Result<(), String> {
    let (storefront, _notices) = Storefront::remote(config).map_err(|e| e.to_string())?;
    let mut catalog = storefront.catalog();
    catalog.filter = filter;
    catalog.load(limit).await.map_err(|e| e.to_string())?;

    for product in catalog.visible() {
        let stock = if product.in_stock() { format!("{} left", product.stock) } else { "out of stock".to_string() };
        println!("{:<28} {:<12} {:>12}  {}", product.name, product.category.as_str(), format_price(Some(product.price)), stock);
    }
    storefront.shutdown().await
}

async fn repair_images(config: &StorefrontConfig, dry_run: bool) -> Result<(), String> {
    let (storefront, _notices) = Storefront::remote(config).map_err(|e| e.to_string())?;
    let report = storefront.image_repair().run(dry_run).await.map_err(|e| e.to_string())?;
    for (id, url) in &report.products {
        println!("products/{id} -> {url}");
    }
    for id in &report.orders {
        println!("orders/{id} items updated");
    }
    info!(changed = report.changed(), dry_run, "Image repair complete");
    storefront.shutdown().await
}

fn demo_catalog() -> Vec<Product> {
    vec![
        Product::new("p1", "Empanadas de pino", 1500.0, 40).with_category(Category::Lunch),
        Product::new("p2", "Veggie wraps", 4500.0, 12).with_category(Category::Lunch).vegetarian(true),
        Product::new("p3", "Coffee break", 8900.0, 8).with_category(Category::Breakfast).combo(true),
        Product::new("p4", "Tres leches", 12500.0, 0).with_category(Category::Desserts),
    ]
}

fn print_notices(events: Vec<UiEvent>) {
    for event in events {
        match event {
            UiEvent::Notice(notice) => info!(level = ?notice.level, "{}", notice.message),
            UiEvent::Navigate(route) => info!(%route, "Navigate"),
        }
    }
}

async fn demo(config: &StorefrontConfig) -> Result<(), String> {
    info!("Starting demo on the in-memory backend");
    let (storefront, mut notices) = Storefront::in_memory(config);
    let backend = storefront.backend().ok_or("memory backend missing")?.clone();

    backend.seed_products(demo_catalog()).await.map_err(|e| e.to_string())?;
    backend
        .seed_account("ana@example.com", "secret1", "Ana", Role::User)
        .await
        .map_err(|e| e.to_string())?;
    backend
        .seed_account("admin@example.com", "secret1", "Admin", Role::Admin)
        .await
        .map_err(|e| e.to_string())?;
    storefront.session().init().await;

    let span = tracing::info_span!("customer_session");
    async {
        storefront.session().sign_in("ana@example.com", "secret1").await.map_err(|e| e.to_string())?;

        let mut catalog = storefront.catalog();
        catalog.load(None).await.map_err(|e| e.to_string())?;
        catalog.filter.vegetarian = true;
        info!(visible = catalog.visible().len(), "Vegetarian filter applied");
        catalog.reset_filters();
        for product_id in ["p1", "p1", "p2", "p4"] {
            // The sold-out product only produces a notice.
            let _ = catalog.add_to_cart(product_id).await;
        }
        let badge = storefront.badge().refresh().await?;
        info!(badge, "Cart badge");

        let mut cart = storefront.cart().await;
        let event_day = Local::now().date_naive() + Days::new(7);
        cart.set_event_date(&event_day.format("%Y-%m-%d").to_string())
            .await
            .map_err(|e| e.to_string())?;
        cart.form.address = "Av. Providencia 1234, Santiago".into();
        cart.form.people_count = "25".into();
        info!(total = %cart.formatted_total(), items = cart.item_count(), "Checking out");
        cart.checkout().await.map_err(|e| e.to_string())?;

        let mut history = storefront.order_history();
        history.load().await.map_err(|e| e.to_string())?;
        for summary in history.summaries() {
            info!(id = %summary.id, status = summary.status, date = %summary.event_date, total = %summary.total, "Order");
        }
        storefront.session().sign_out().await.map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;
    print_notices(drain(&mut notices));

    let span = tracing::info_span!("admin_session");
    async {
        storefront.session().sign_in("admin@example.com", "secret1").await.map_err(|e| e.to_string())?;
        let mut orders = storefront.admin_orders();
        orders.load().await.map_err(|e| e.to_string())?;
        let ids: Vec<String> = orders.orders().iter().map(|o| o.id.clone()).collect();
        for id in &ids {
            orders.set_status(id, OrderStatus::Confirmed).await.map_err(|e| e.to_string())?;
        }
        info!(confirmed = ids.len(), "Orders confirmed");
        storefront.session().sign_out().await.map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;
    print_notices(drain(&mut notices));

    storefront.shutdown().await?;
    info!("Demo completed successfully");
    Ok(())
}
