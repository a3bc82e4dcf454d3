use care_reminder_infra::ReminderContext;
use std::fmt::Debug;

#[async_trait::async_trait]
pub trait UseCase: Debug + Send {
    type Response: Send;
    type Error: Send;

    const NAME: &'static str;

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Error>;
}

/// Runs the `UseCase` inside its own tracing span. Callers log the
/// outcome, a deferred reminder is not a failure.
#[tracing::instrument(name = "UseCase executed", skip(usecase, ctx), fields(usecase = U::NAME))]
pub async fn execute<U>(mut usecase: U, ctx: &ReminderContext) -> Result<U::Response, U::Error>
where
    U: UseCase,
    U::Error: Debug,
{
    usecase.execute(ctx).await
}
