use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::{Duration, Instant};

// Sepolia tokens the backend routes between by default
const LINK: &str = "0x779877A7B0D9E8603169DdbD7836e478b4624789";
const USDC: &str = "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238";
const WETH: &str = "0xfFf9976782d46CC05630D1f6eBAb18b2324d6B14";

#[derive(Debug, Deserialize)]
struct AmountsOutResponse {
    #[serde(rename = "amountOut")]
    amount_out: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AmountsInResponse {
    #[serde(rename = "amountIn")]
    amount_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    quote: String,
    #[serde(rename = "quoteCurrency")]
    quote_currency: String,
    #[serde(rename = "minimumReceived")]
    minimum_received: String,
    path: Vec<String>,
    fees: Vec<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let client = HttpClient::builder().timeout(Duration::from_secs(30)).build()?;

    println!("🧪 SWAP ROUTER SMOKE TEST against {}", base_url);
    println!("🕐 {}", chrono::Utc::now().to_rfc3339());
    println!("{}", "=".repeat(60));
    println!();

    println!("🔍 TEST 1: Health");
    let health: serde_json::Value = client.get(format!("{}/health", base_url)).send().await?.json().await?;
    println!("   ✅ {} (chains {})", health["status"], health["chains"]);
    println!();

    println!("💱 TEST 2: Exact-input quotes");
    for (token_in, token_out, amount, label) in [
        (WETH, USDC, "0.01", "WETH -> USDC"),
        (LINK, USDC, "1", "LINK -> USDC"),
        (USDC, LINK, "5", "USDC -> LINK"),
    ] {
        let start = Instant::now();
        let response = client
            .get(format!("{}/api/v1/quote/amounts-out", base_url))
            .query(&[("amountIn", amount), ("tokenIn", token_in), ("tokenOut", token_out)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            println!("   ❌ {} {}: HTTP {} {}", amount, label, status, response.text().await?);
            continue;
        }
        let body: AmountsOutResponse = response.json().await?;
        match body.amount_out {
            Some(out) => println!("   ✅ {} {} = {} ({}ms)", amount, label, out, start.elapsed().as_millis()),
            None => println!("   ⚠️ {} {}: no route", amount, label),
        }
    }
    println!();

    println!("🎯 TEST 3: Exact-output quote");
    let response = client
        .get(format!("{}/api/v1/quote/amounts-in", base_url))
        .query(&[("amountOut", "1"), ("tokenIn", USDC), ("tokenOut", LINK)])
        .send()
        .await?;
    if response.status().is_success() {
        let body: AmountsInResponse = response.json().await?;
        println!("   ✅ 1 LINK costs {:?} USDC", body.amount_in);
    } else {
        println!("   ❌ HTTP {}", response.status());
    }
    println!();

    println!("🛣️ TEST 4: Route with method parameters");
    let response = client
        .get(format!("{}/api/v1/route", base_url))
        .query(&[("tokenIn", LINK), ("tokenOut", USDC), ("amountIn", "1"), ("slippage", "0.5")])
        .send()
        .await?;
    if response.status().is_success() {
        let route: RouteResponse = response.json().await?;
        println!("   ✅ {} {} (min {})", route.quote, route.quote_currency, route.minimum_received);
        println!("   Path: {}", route.path.join(" -> "));
        println!("   Fees: {:?}", route.fees);
    } else {
        println!("   ❌ HTTP {}: {}", response.status(), response.text().await?);
    }
    println!();

    println!("🚫 TEST 5: Missing parameters");
    let response = client.get(format!("{}/api/v1/route", base_url)).send().await?;
    println!("   {} HTTP {} (expected 400)", if response.status().as_u16() == 400 { "✅" } else { "❌" }, response.status());
    println!();

    println!("🎉 Smoke test completed!");
    Ok(())
}
