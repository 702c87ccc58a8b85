//! Interactive model selection

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use dialoguer::Select;
use qory_providers::CompletionClient;

/// Group `provider/model` IDs by provider.
///
/// Returns `None` unless every ID carries a provider prefix.
fn group_by_provider(models: &[String]) -> Option<BTreeMap<String, Vec<String>>> {
    let mut providers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for model in models {
        let (provider, name) = model.split_once('/')?;
        providers
            .entry(provider.to_string())
            .or_default()
            .push(name.to_string());
    }

    for names in providers.values_mut() {
        names.sort();
    }
    Some(providers)
}

fn pick(prompt: &str, items: &[String]) -> Result<String> {
    let index = Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()?;
    Ok(items[index].clone())
}

/// Ask the user to pick one of the provider's models
pub async fn select_model(client: &CompletionClient) -> Result<String> {
    let models = client.available_models().await?;
    if models.is_empty() {
        bail!("the provider offers no models");
    }

    match group_by_provider(&models) {
        Some(providers) => {
            let names: Vec<String> = providers.keys().cloned().collect();
            let provider = pick("Provider", &names)?;
            let model = pick("Model", &providers[&provider])?;
            Ok(format!("{}/{}", provider, model))
        }
        None => pick("Model", &models),
    }
}
