//! End-to-end check against the deployed funnel API: price a tariff, then
//! import a contract for it.
//!
//! The import depends on the tariff id from pricing, so a rejected pricing
//! step ends the run before any import request is sent.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument};

use crate::api::{
    default_start_date, test_meter_number, unique_test_email, FunnelClient, ImportContract,
    ImportCustomer, ImportRequest, ImportResponse, MeterLocation, PricingRequest, PricingResponse,
};
use crate::config::{EvuConfig, ProductionConfig};
use crate::error::{ProbeError, Result};

/// First tariff offered by the pricing step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TariffQuote {
    pub id: String,
    pub monthly_cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationReport {
    pub base_url: String,
    pub quote: TariffQuote,
    pub email: String,
    pub contract_id: Option<String>,
    pub draft_id: Option<String>,
}

/// Price, then import. Errors carry HTTP status and body where available.
#[instrument(skip_all)]
pub async fn run_integration(config: &EvuConfig) -> Result<IntegrationReport> {
    let base_url = config.production_url()?;
    let settings = &config.production;
    let client = FunnelClient::new(&base_url, Duration::from_millis(settings.timeout_ms))?;

    let quote = fetch_quote(&client, settings).await?;
    info!(tariff = %quote.id, monthly_cost = ?quote.monthly_cost, "pricing ok");

    let email = unique_test_email(&settings.email_domain);
    let request = build_import_request(&quote, settings, &email);
    let imported = submit_import(&client, &settings.import_path, &request).await?;
    info!(
        contract_id = ?imported.contract_id(),
        draft_id = ?imported.draft_id(),
        "contract import ok"
    );

    Ok(IntegrationReport {
        base_url,
        quote,
        email,
        contract_id: imported.contract_id(),
        draft_id: imported.draft_id(),
    })
}

/// POST the pricing request and pick the first tariff.
pub async fn fetch_quote(
    client: &FunnelClient,
    settings: &ProductionConfig,
) -> Result<TariffQuote> {
    let request = PricingRequest {
        plz: settings.plz.clone(),
        jahresverbrauch: settings.jahresverbrauch,
        haushaltgroesse: None,
        funnel_id: Some(settings.funnel_id.clone()),
    };

    let response = client.post_json(&settings.pricing_path, &request).await?;
    if !response.is_success() {
        return Err(ProbeError::status("pricing", response.status, response.body));
    }

    let pricing: PricingResponse = response.json("pricing response")?;
    if !pricing.is_success() {
        return Err(ProbeError::rejected("pricing", response.body));
    }

    pricing
        .tariffs()
        .into_iter()
        .find_map(|tariff| {
            let monthly_cost = tariff.monthly_cost();
            tariff.id_string().map(|id| TariffQuote { id, monthly_cost })
        })
        .ok_or_else(|| {
            ProbeError::rejected("pricing", format!("no usable tariff in {}", response.body))
        })
}

/// Import payload for `quote` with synthetic customer and meter data.
pub fn build_import_request(
    quote: &TariffQuote,
    settings: &ProductionConfig,
    email: &str,
) -> ImportRequest {
    ImportRequest {
        customer: ImportCustomer {
            salutation: "Herr".to_string(),
            first_name: "Max".to_string(),
            last_name: "Testkunde".to_string(),
            email: email.to_string(),
            phone: "+49 30 12345678".to_string(),
            birth_date: "1985-04-12".to_string(),
        },
        contract: ImportContract {
            tariff_id: quote.id.clone(),
            funnel_id: settings.funnel_id.clone(),
            start_date: default_start_date(),
            annual_consumption: settings.jahresverbrauch,
            postal_code: settings.plz.clone(),
        },
        meter_location: MeterLocation {
            street: "Teststraße".to_string(),
            house_number: "1".to_string(),
            postal_code: settings.plz.clone(),
            city: "Berlin".to_string(),
            meter_number: test_meter_number(),
        },
    }
}

async fn submit_import(
    client: &FunnelClient,
    path: &str,
    request: &ImportRequest,
) -> Result<ImportResponse> {
    let response = client.post_json(path, request).await?;
    if !response.is_success() {
        return Err(ProbeError::status("contract import", response.status, response.body));
    }

    let imported: ImportResponse = response.json("import response")?;
    if !imported.success {
        return Err(ProbeError::rejected("contract import", response.body));
    }
    Ok(imported)
}
