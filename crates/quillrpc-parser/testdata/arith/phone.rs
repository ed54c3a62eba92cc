use serde::{Deserialize, Serialize};

/// Phone book service.
/// quillrpc
pub struct PhoneBook;

/// Identity fields shared by person records.
#[derive(Debug, Serialize, Deserialize)]
pub struct Identity {
    /// Unique identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Person {
    #[serde(flatten)]
    pub identity: Identity,
    /// Main phone.
    pub phone: String,
    #[serde(rename = "address")]
    pub alt_address: Option<Address>,
    pub mobile: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
}

impl PhoneBook {
    /// Get returns a page of people.
    /// quillrpc:page(p)=0 current page
    /// quillrpc:count=50 page size
    pub fn get(&self, page: Option<i64>, count: Option<i64>) -> Vec<Person> {
        let _ = (page, count);
        Vec::new()
    }

    /// ById returns a person.
    /// quillrpc:id person id
    /// quillrpc:404 person was not found
    pub fn by_id(&self, id: u64) -> Result<Person, quillrpc::Error> {
        let _ = id;
        Err(quillrpc::Error::new(404, "person was not found"))
    }

    /// Save stores a person.
    /// quillrpc:replace=false update person if exists
    /// quillrpc:400 invalid request
    /// quillrpc:401 use replace=true
    pub fn save(&self, p: Person, replace: Option<bool>) -> Result<u64, quillrpc::Error> {
        let _ = (p, replace);
        Ok(0)
    }
}
