//! woo-to-sp CLI - Convert WooCommerce exports to Shopify import CSVs
//!
//! # Commands
//!
//! ```bash
//! woo-to-sp orders -i orders.csv -o shopify_orders.csv -m meta_fields.csv
//! woo-to-sp customers -w customers.csv -m mailchimp_export.zip -o shopify_customers.csv
//! woo-to-sp products -i products.csv -o shopify_products.csv --skip-drafts
//! woo-to-sp collections -i categories.csv -o shopify_collections.csv
//! woo-to-sp reviews -i reviews.csv -o shopify_reviews.csv -m product_handles.csv
//! woo-to-sp discounts -i coupons.csv -o shopify_discounts.csv --min-amount 10
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use woo_to_shopify::config::{DEFAULT_LOG_DIR, DEFAULT_REPORT_DIR};
use woo_to_shopify::logs::init_logging;
use woo_to_shopify::{
    run_migration, CollectionMapper, CollectionOptions, CustomerMapper, CustomerOptions,
    DiscountMapper, DiscountOptions, OrderMapper, OrderOptions, ProductMapper, ProductOptions,
    RecordMapper, ReviewMapper, ReviewOptions, RunOptions,
};

#[derive(Parser)]
#[command(name = "woo-to-sp")]
#[command(version, about = "Convert WooCommerce exports to Shopify import CSVs", long_about = None)]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable progress lines
    #[arg(long, global = true)]
    no_progress: bool,

    /// Directory for log files
    #[arg(long, global = true, env = "WOO_TO_SP_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    /// Directory for JSON reports
    #[arg(long, global = true, env = "WOO_TO_SP_REPORT_DIR", default_value = DEFAULT_REPORT_DIR)]
    report_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Input and output shared by the single-file tools.
#[derive(Args)]
struct Io {
    /// Input WooCommerce CSV
    #[arg(short, long)]
    input: PathBuf,

    /// Output Shopify CSV
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Orders, one row per line item
    Orders {
        #[command(flatten)]
        io: Io,

        /// Meta-field rules (meta_key,name_suffix,sku_prefix[,price_field][,kind])
        #[arg(short = 'm', long)]
        meta_mapping: Option<PathBuf>,

        /// Number of line-item columns to scan
        #[arg(long, default_value_t = 19)]
        max_line_items: usize,

        /// Currency when the order has none
        #[arg(long, default_value = "USD")]
        currency: String,
    },

    /// Customers from WooCommerce and/or a Mailchimp export
    Customers {
        /// WooCommerce customers CSV
        #[arg(short, long)]
        woo_file: Option<PathBuf>,

        /// Mailchimp export folder or zip
        #[arg(short, long)]
        mailchimp_folder: Option<PathBuf>,

        /// Output Shopify CSV
        #[arg(short, long, default_value = "shopify_customers_import.csv")]
        output: PathBuf,
    },

    /// Products with variants and images
    Products {
        #[command(flatten)]
        io: Io,

        /// Image URL mapping (old_url,new_url)
        #[arg(short = 'm', long)]
        image_mapping: Option<PathBuf>,

        /// Leave draft products out
        #[arg(long)]
        skip_drafts: bool,

        /// Do not emit image columns
        #[arg(long)]
        no_images: bool,
    },

    /// Categories to collections
    Collections {
        #[command(flatten)]
        io: Io,

        /// Category image mapping (term_id,image_url)
        #[arg(short = 'm', long)]
        image_mapping: Option<PathBuf>,

        /// Custom collections without rules
        #[arg(long)]
        manual_collections: bool,
    },

    /// Product reviews
    Reviews {
        #[command(flatten)]
        io: Io,

        /// Product mapping (product_id,handle)
        #[arg(short = 'm', long)]
        product_mapping: Option<PathBuf>,

        /// Rating for reviews that have none
        #[arg(long, default_value_t = 5)]
        default_rating: i64,
    },

    /// Coupons to discount codes
    Discounts {
        #[command(flatten)]
        io: Io,

        /// Product mapping (product_id,shopify_id)
        #[arg(short = 'm', long)]
        product_mapping: Option<PathBuf>,

        /// Minimum purchase when the coupon has none
        #[arg(long, default_value_t = 0.0)]
        min_amount: f64,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let globals = Globals {
        verbose: cli.verbose,
        show_progress: !cli.no_progress,
        log_dir: cli.log_dir,
        report_dir: cli.report_dir,
    };

    let result = match cli.command {
        Commands::Orders {
            io,
            meta_mapping,
            max_line_items,
            currency,
        } => cmd_orders(&globals, io, meta_mapping, max_line_items, currency),

        Commands::Customers {
            woo_file,
            mailchimp_folder,
            output,
        } => cmd_customers(&globals, woo_file, mailchimp_folder, output),

        Commands::Products {
            io,
            image_mapping,
            skip_drafts,
            no_images,
        } => cmd_products(&globals, io, image_mapping, skip_drafts, no_images),

        Commands::Collections {
            io,
            image_mapping,
            manual_collections,
        } => cmd_collections(&globals, io, image_mapping, manual_collections),

        Commands::Reviews {
            io,
            product_mapping,
            default_rating,
        } => cmd_reviews(&globals, io, product_mapping, default_rating),

        Commands::Discounts {
            io,
            product_mapping,
            min_amount,
        } => cmd_discounts(&globals, io, product_mapping, min_amount),
    };

    if let Err(e) = result {
        tracing::error!("Migration failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct Globals {
    verbose: bool,
    show_progress: bool,
    log_dir: PathBuf,
    report_dir: PathBuf,
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Set up logging for the tool, run it and print the outcome.
fn run<M: RecordMapper>(
    globals: &Globals,
    mapper: &mut M,
    input: Option<PathBuf>,
    output: PathBuf,
    mapping: Option<PathBuf>,
) -> CmdResult {
    init_logging(mapper.tool_name(), &globals.log_dir, globals.verbose);

    let options = RunOptions::new(input, output)
        .with_mapping(mapping)
        .with_report_dir(&globals.report_dir)
        .with_progress(globals.show_progress);
    let summary = run_migration(mapper, &options)?;

    let stats = &summary.statistics;
    eprintln!(
        "{}: {} of {} rows converted ({} failed, {} warnings)",
        summary.tool_name, stats.successful, stats.total, stats.failed, stats.warnings
    );
    match &summary.output_written {
        Some(path) => eprintln!("Output written to: {}", path.display()),
        None => eprintln!("Nothing converted, no output written"),
    }
    eprintln!("Report: {}", summary.report_path.display());
    Ok(())
}

fn cmd_orders(
    globals: &Globals,
    io: Io,
    meta_mapping: Option<PathBuf>,
    max_line_items: usize,
    currency: String,
) -> CmdResult {
    let options = OrderOptions {
        max_line_items,
        default_currency: currency,
        ..Default::default()
    };
    let mut mapper = OrderMapper::new(options);
    run(globals, &mut mapper, Some(io.input), io.output, meta_mapping)
}

fn cmd_customers(
    globals: &Globals,
    woo_file: Option<PathBuf>,
    mailchimp_folder: Option<PathBuf>,
    output: PathBuf,
) -> CmdResult {
    if woo_file.is_none() && mailchimp_folder.is_none() {
        return Err("At least one of --woo-file or --mailchimp-folder is required".into());
    }
    let mut mapper = CustomerMapper::new(CustomerOptions {
        mailchimp_export: mailchimp_folder,
    });
    run(globals, &mut mapper, woo_file, output, None)
}

fn cmd_products(
    globals: &Globals,
    io: Io,
    image_mapping: Option<PathBuf>,
    skip_drafts: bool,
    no_images: bool,
) -> CmdResult {
    let options = ProductOptions {
        image_migration: !no_images,
        skip_drafts,
        ..Default::default()
    };
    let mut mapper = ProductMapper::new(options);
    run(globals, &mut mapper, Some(io.input), io.output, image_mapping)
}

fn cmd_collections(
    globals: &Globals,
    io: Io,
    image_mapping: Option<PathBuf>,
    manual_collections: bool,
) -> CmdResult {
    let options = CollectionOptions {
        use_smart_collections: !manual_collections,
        ..Default::default()
    };
    let mut mapper = CollectionMapper::new(options);
    run(globals, &mut mapper, Some(io.input), io.output, image_mapping)
}

fn cmd_reviews(
    globals: &Globals,
    io: Io,
    product_mapping: Option<PathBuf>,
    default_rating: i64,
) -> CmdResult {
    let mut mapper = ReviewMapper::new(ReviewOptions { default_rating });
    run(globals, &mut mapper, Some(io.input), io.output, product_mapping)
}

fn cmd_discounts(
    globals: &Globals,
    io: Io,
    product_mapping: Option<PathBuf>,
    min_amount: f64,
) -> CmdResult {
    let options = DiscountOptions {
        default_minimum_amount: min_amount,
        ..Default::default()
    };
    let mut mapper = DiscountMapper::new(options);
    run(globals, &mut mapper, Some(io.input), io.output, product_mapping)
}
