use rust_decimal::Decimal;
use tracing::{error, info, warn, Instrument};
use stock_guard::app_system::{setup_tracing, InventorySystem};
use stock_guard::config::InventoryConfig;
use stock_guard::domain::{Account, Product, ProductId, UserId};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = InventoryConfig::from_env().map_err(|e| e.to_string())?;
    info!(?config, "Starting inventory system");

    let system = InventorySystem::new(&config);

    // Seed the catalog and a few buyers
    let seed = async {
        system.save_product(Product::new(1, "Mechanical keyboard", Decimal::new(8900, 2), 5)).await?;
        system.save_product(Product::new(2, "USB-C cable", Decimal::new(990, 2), 40)).await?;
        for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol"), (4, "dave")] {
            system.open_account(Account::new(id, name, Decimal::new(20000, 2))).await?;
        }
        system.warm_up().await
    }
    .instrument(tracing::info_span!("seeding"))
    .await
    .map_err(|e| e.to_string())?;
    info!(products = seed, "Catalog ready");

    // Four buyers compete for five keyboards, two each
    let mut buyers = Vec::new();
    for user in 1..=4u64 {
        let checkout = system.checkout.clone();
        let span = tracing::info_span!("buyer", user_id = user);
        buyers.push(tokio::spawn(async move {
            let user_id = UserId(user);
            checkout.add_to_cart(user_id, ProductId(1), 2).await?;
            checkout.add_to_cart(user_id, ProductId(2), 1).await?;
            checkout.checkout(user_id).await
        }.instrument(span)));
    }

    for buyer in buyers {
        match buyer.await {
            Ok(Ok(receipt)) => info!(
                user_id = %receipt.user_id,
                charged = %receipt.total_charged,
                balance = %receipt.remaining_balance,
                "Order placed"
            ),
            Ok(Err(e)) if e.is_business() => warn!(error = %e, "Order declined"),
            Ok(Err(e)) => error!(error = %e, retryable = e.is_retryable(), "Order failed"),
            Err(e) => error!(error = %e, "Buyer task panicked"),
        }
    }

    let restocked = system.checkout.restock(ProductId(1), 10).await.map_err(|e| e.to_string())?;
    info!(product_id = 1, stock = restocked, "Restocked");

    // Shutdown system gracefully
    system.shutdown().await.map_err(|e| e.to_string())?;

    info!("Application completed successfully");
    Ok(())
}
