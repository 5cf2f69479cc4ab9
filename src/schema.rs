table! {
    categories (id) {
        id -> Int4,
        title -> Varchar,
        slug -> Varchar,
        description -> Text,
        is_published -> Bool,
        created_at -> Timestamp,
    }
}

table! {
    comments (id) {
        id -> Int4,
        post_id -> Int4,
        author -> Varchar,
        text -> Text,
        created_at -> Timestamp,
    }
}

table! {
    locations (id) {
        id -> Int4,
        name -> Varchar,
        is_published -> Bool,
        created_at -> Timestamp,
    }
}

table! {
    posts (id) {
        id -> Int4,
        title -> Varchar,
        text -> Text,
        pub_date -> Timestamp,
        author -> Varchar,
        category_id -> Nullable<Int4>,
        location_id -> Nullable<Int4>,
        is_published -> Bool,
        created_at -> Timestamp,
    }
}

table! {
    sessions (id) {
        id -> Varchar,
        user -> Varchar,
        expires -> Timestamp,
    }
}

table! {
    users (id) {
        id -> Varchar,
        hash -> Varchar,
        salt -> Bytea,
        email -> Varchar,
        first_name -> Varchar,
        last_name -> Varchar,
    }
}

joinable!(comments -> posts (post_id));
joinable!(comments -> users (author));
joinable!(posts -> categories (category_id));
joinable!(posts -> locations (location_id));
joinable!(posts -> users (author));
joinable!(sessions -> users (user));

allow_tables_to_appear_in_same_query!(categories, comments, locations, posts, sessions, users,);
