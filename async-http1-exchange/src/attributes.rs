use core::any::Any;
use std::collections::HashMap;

use crate::error::ExchangeError;

pub type AttributeValue = Box<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct Attributes {
    inner: HashMap<String, AttributeValue>,
}

impl core::fmt::Debug for Attributes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.inner.keys()).finish()
    }
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<Option<&(dyn Any + Send + Sync)>, ExchangeError> {
        check_name(name)?;
        Ok(self.inner.get(name).map(|x| x.as_ref()))
    }

    pub fn get_as<T: Any>(&self, name: &str) -> Result<Option<&T>, ExchangeError> {
        Ok(self.get(name)?.and_then(|x| x.downcast_ref::<T>()))
    }

    pub fn set<T>(&mut self, name: &str, value: T) -> Result<Option<AttributeValue>, ExchangeError>
    where
        T: Any + Send + Sync,
    {
        check_name(name)?;
        Ok(self.inner.insert(name.to_owned(), Box::new(value)))
    }

    pub fn remove(&mut self, name: &str) -> Result<Option<AttributeValue>, ExchangeError> {
        check_name(name)?;
        Ok(self.inner.remove(name))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

fn check_name(name: &str) -> Result<(), ExchangeError> {
    if name.is_empty() {
        return Err(ExchangeError::Contract("attribute name is empty"));
    }
    Ok(())
}
