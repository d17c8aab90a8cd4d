/// Demo user records backing the CRUD routes
///
/// Exists only so the app under test can exercise ordinary REST calls.
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,

    /// Any extra fields the client sent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial update accepted by PATCH
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug)]
pub struct UserStore {
    users: RwLock<Vec<User>>,
}

impl UserStore {
    /// Store seeded with the two demo users
    pub fn seeded() -> Self {
        Self {
            users: RwLock::new(vec![
                User {
                    id: 1,
                    name: "John Doe".to_string(),
                    email: "john@example.com".to_string(),
                    extra: Map::new(),
                },
                User {
                    id: 2,
                    name: "Jane Doe".to_string(),
                    email: "jane@example.com".to_string(),
                    extra: Map::new(),
                },
            ]),
        }
    }

    pub fn list(&self) -> Vec<User> {
        self.users.read().clone()
    }

    pub fn get(&self, id: u64) -> Option<User> {
        self.users.read().iter().find(|u| u.id == id).cloned()
    }

    /// Append a record built from an arbitrary JSON body; returns its id
    pub fn create(&self, body: &Value) -> u64 {
        let mut users = self.users.write();
        let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let user = user_from_body(id, body, None);
        users.push(user);
        id
    }

    pub fn update(&self, id: u64, patch: UserPatch) -> Option<User> {
        let mut users = self.users.write();
        let user = users.iter_mut().find(|u| u.id == id)?;
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        Some(user.clone())
    }

    /// Replace a record wholesale; the id is kept
    pub fn replace(&self, id: u64, body: &Value) -> Option<User> {
        let mut users = self.users.write();
        let user = users.iter_mut().find(|u| u.id == id)?;
        *user = user_from_body(id, body, Some(&*user));
        Some(user.clone())
    }

    pub fn delete(&self, id: u64) -> bool {
        let mut users = self.users.write();
        let before = users.len();
        users.retain(|u| u.id != id);
        users.len() != before
    }
}

fn user_from_body(id: u64, body: &Value, previous: Option<&User>) -> User {
    let field = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                previous.map(|p| match key {
                    "name" => p.name.clone(),
                    _ => p.email.clone(),
                })
            })
            .unwrap_or_default()
    };

    let mut extra = body.as_object().cloned().unwrap_or_default();
    for key in ["id", "name", "email"] {
        extra.remove(key);
    }

    User {
        id,
        name: field("name"),
        email: field("email"),
        extra,
    }
}
