use diesel::{table, allow_tables_to_appear_in_same_query};

table! {
    push_device_registration (id) {
        id -> BigInt,
        app_id -> BigInt,
        push_token -> Text,
        platform -> Text,
        activation_id -> Nullable<Text>,
        active -> Bool,
        user_id -> Nullable<Text>,
        encryption_key -> Nullable<Text>,
        encryption_key_index -> Nullable<Text>,
        timestamp_last_registered -> Timestamptz,
    }
}

table! {
    push_app_credential (id) {
        id -> BigInt,
        app_id -> BigInt,
        ios_private_key -> Nullable<Bytea>,
        ios_team_id -> Nullable<Text>,
        ios_key_id -> Nullable<Text>,
        ios_bundle -> Nullable<Text>,
        android_server_key -> Nullable<Text>,
        android_bundle -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

allow_tables_to_appear_in_same_query!(
    push_device_registration,
    push_app_credential,
);
