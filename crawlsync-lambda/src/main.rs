//! Function entry point.
//!
//! The profile and the AWS clients are set up once per cold start; each
//! event then runs a fresh invocation against them.

use crawlsync_core::adapters::aws::{AwsServices, GlueCrawlerService, SecretsManagerStore};
use crawlsync_core::{DeploymentProfile, LogFormat, init_logging, initialize_configuration_validator};
use crawlsync_lambda::{handle_event, load_profile, profile_path_from_env};
use lambda_runtime::{Error, LambdaEvent, service_fn};
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, error, info_span};

struct FunctionState {
    profile: DeploymentProfile,
    secrets: SecretsManagerStore,
    crawler: GlueCrawlerService,
}

async fn handle_request(state: &FunctionState, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let span = info_span!("request", request_id = %event.context.request_id);

    async {
        match handle_event(&event.payload, &state.profile, &state.secrets, &state.crawler).await {
            Ok(report) => Ok(serde_json::to_value(report)?),
            Err(failure) => {
                error!(
                    kind = failure.kind,
                    retryable = failure.retryable,
                    "Invocation failed; previous crawler configuration left in place"
                );
                Err(Error::from(failure))
            }
        }
    }
    .instrument(span)
    .await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging(0, false, LogFormat::Json)?;
    initialize_configuration_validator()?;

    let profile = load_profile(&profile_path_from_env()).await?;
    let aws = AwsServices::load(profile.region.clone(), profile.timeouts.longest()).await;
    let state = Arc::new(FunctionState {
        secrets: aws.secret_store(),
        crawler: aws.crawler_service(),
        profile,
    });

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let state = Arc::clone(&state);
        async move { handle_request(&state, event).await }
    }))
    .await
}
