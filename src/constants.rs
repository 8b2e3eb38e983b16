pub mod session {

    pub const USER_ID: &str = "user_id";

    pub const FLASHES: &str = "_flashes";

    pub const CSRF_TOKEN: &str = "_csrf";
}

pub mod routes {

    pub const USERS: &str = "/users";

    pub const LOGIN: &str = "/users/login";
}

pub mod limits {

    pub const MAX_USERNAME_LEN: usize = 50;

    pub const MAX_NAME_LEN: usize = 100;

    pub const MAX_MESSAGE_LEN: usize = 1000;

    pub const MAX_IMAGE_URL_LEN: usize = 2048;
}
