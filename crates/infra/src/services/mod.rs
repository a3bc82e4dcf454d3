mod push;

pub use push::{
    FcmPushNotifier, IPushNotifier, InMemoryPushNotifier, PushError, SentPush, ServiceAccountKey,
};
