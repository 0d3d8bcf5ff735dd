use std::sync::Arc;

use answer_api::{AnswerApiClient, AnswerApiError};
use answer_provider::AnswerTransport;
use answer_provider_mock::ScriptedTransport;
use legal_qa::ClientConfig;

use crate::args::Provider;

pub fn transport_for(
    provider: Provider,
    config: &ClientConfig,
) -> Result<Arc<dyn AnswerTransport>, AnswerApiError> {
    match provider {
        Provider::Http => Ok(Arc::new(AnswerApiClient::new(config.answer_api_config())?)),
        Provider::Mock => Ok(Arc::new(ScriptedTransport::demo())),
    }
}
